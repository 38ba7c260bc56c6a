//! Row packing for the opportunity timeline grid.
//!
//! Each category renders as a grid of three columns (SHORT, MID, LONG). A card starting in
//! column `c` with span `s` covers columns `c..c + s`. Cards are placed greedily, first fit
//! by row, in input order: the first row whose covered columns are all free wins, and a new
//! row is appended when none is free. The starting cell holds the item and the other covered
//! cells hold [`GridCell::Occupied`] so later cards skip them.

use db::models::opportunity::{TIMELINE_COLUMNS, Timeline};

/// Rows available before any card is placed.
pub const INITIAL_ROWS: usize = 5;

const COLUMNS: usize = TIMELINE_COLUMNS as usize;

/// Effective span of a card: `span` clamped to `[1, 3 - column]`.
pub fn effective_span(timeline: Timeline, span: i64) -> u8 {
    timeline.clamp_span(span)
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRequest<T> {
    pub item: T,
    pub timeline: Timeline,
    /// Stored span. May be stale after a move; it is re-clamped on placement.
    pub span: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridCell<T> {
    Empty,
    Start { item: T, span: u8 },
    Occupied,
}

impl<T> GridCell<T> {
    pub fn is_free(&self) -> bool {
        matches!(self, GridCell::Empty)
    }

    pub fn is_start(&self) -> bool {
        matches!(self, GridCell::Start { .. })
    }
}

/// Where one item landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement<'a, T> {
    pub item: &'a T,
    pub row: usize,
    pub column: u8,
    pub span: u8,
}

impl<T> Placement<'_, T> {
    /// Columns this placement covers, start inclusive.
    pub fn columns(&self) -> std::ops::Range<u8> {
        self.column..self.column + self.span
    }
}

pub type GridRow<T> = [GridCell<T>; COLUMNS];

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineGrid<T> {
    rows: Vec<GridRow<T>>,
}

fn empty_row<T>() -> GridRow<T> {
    std::array::from_fn(|_| GridCell::Empty)
}

impl<T> TimelineGrid<T> {
    /// Pack `requests` in the order given. Never fails; bad spans clamp silently.
    pub fn pack(requests: impl IntoIterator<Item = PlacementRequest<T>>) -> Self {
        let mut rows: Vec<GridRow<T>> = (0..INITIAL_ROWS).map(|_| empty_row()).collect();

        for request in requests {
            let column = usize::from(request.timeline.column());
            let span = effective_span(request.timeline, request.span);
            let covered = column..column + usize::from(span);

            let row_index = match rows
                .iter()
                .position(|row| row[covered.clone()].iter().all(GridCell::is_free))
            {
                Some(index) => index,
                None => {
                    rows.push(empty_row());
                    rows.len() - 1
                }
            };

            let row = &mut rows[row_index];
            for cell in &mut row[column + 1..covered.end] {
                *cell = GridCell::Occupied;
            }
            row[column] = GridCell::Start {
                item: request.item,
                span,
            };
        }

        TimelineGrid { rows }
    }

    /// Every row, including unused ones from the initial pool.
    pub fn rows(&self) -> &[GridRow<T>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Rows that hold at least one starting cell, with their original index.
    /// Rows made only of empty or occupied cells are not rendered.
    pub fn visible_rows(&self) -> impl Iterator<Item = (usize, &GridRow<T>)> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(GridCell::is_start))
    }

    pub fn into_visible_rows(self) -> Vec<GridRow<T>> {
        self.rows
            .into_iter()
            .filter(|row| row.iter().any(GridCell::is_start))
            .collect()
    }

    /// Placements in row-major order.
    pub fn placements(&self) -> Vec<Placement<'_, T>> {
        let mut placements = Vec::new();
        for (row_index, row) in self.rows.iter().enumerate() {
            for (column, cell) in row.iter().enumerate() {
                if let GridCell::Start { item, span } = cell {
                    placements.push(Placement {
                        item,
                        row: row_index,
                        column: column as u8,
                        span: *span,
                    });
                }
            }
        }
        placements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(item: &'static str, timeline: Timeline, span: i64) -> PlacementRequest<&'static str> {
        PlacementRequest {
            item,
            timeline,
            span,
        }
    }

    fn find<'a>(grid: &'a TimelineGrid<&'static str>, item: &str) -> Placement<'a, &'static str> {
        grid.placements()
            .into_iter()
            .find(|p| *p.item == item)
            .expect("item placed")
    }

    #[test]
    fn test_four_short_cards_stack_in_first_column() {
        let grid = TimelineGrid::pack(vec![
            request("a", Timeline::Short, 1),
            request("b", Timeline::Short, 1),
            request("c", Timeline::Short, 1),
            request("d", Timeline::Short, 1),
        ]);

        for (expected_row, item) in ["a", "b", "c", "d"].into_iter().enumerate() {
            let placement = find(&grid, item);
            assert_eq!(placement.row, expected_row);
            assert_eq!(placement.column, 0);
            assert_eq!(placement.span, 1);
        }
        for row in grid.rows() {
            assert!(row[1].is_free());
            assert!(row[2].is_free());
        }
        assert_eq!(grid.visible_rows().count(), 4);
    }

    #[test]
    fn test_full_span_blocks_row_for_later_cards() {
        let grid = TimelineGrid::pack(vec![
            request("wide", Timeline::Short, 3),
            request("mid", Timeline::Mid, 1),
        ]);

        let first = &grid.rows()[0];
        assert_eq!(first[0], GridCell::Start { item: "wide", span: 3 });
        assert_eq!(first[1], GridCell::Occupied);
        assert_eq!(first[2], GridCell::Occupied);

        let mid = find(&grid, "mid");
        assert_eq!((mid.row, mid.column), (1, 1));
    }

    #[test]
    fn test_stale_span_is_clamped_after_move_to_long() {
        let grid = TimelineGrid::pack(vec![request("moved", Timeline::Long, 2)]);
        let placement = find(&grid, "moved");
        assert_eq!(placement.column, 2);
        assert_eq!(placement.span, 1);
        assert_eq!(grid.row_count(), INITIAL_ROWS);
    }

    #[test]
    fn test_rows_grow_past_initial_pool() {
        let requests: Vec<_> = ["a", "b", "c", "d", "e", "f", "g"]
            .into_iter()
            .map(|item| request(item, Timeline::Mid, 2))
            .collect();
        let grid = TimelineGrid::pack(requests);

        assert_eq!(grid.row_count(), 7);
        assert_eq!(find(&grid, "g").row, 6);
    }

    #[test]
    fn test_first_fit_reuses_earlier_rows() {
        let grid = TimelineGrid::pack(vec![
            request("a", Timeline::Short, 1),
            request("b", Timeline::Short, 2),
            request("c", Timeline::Long, 1),
            request("d", Timeline::Mid, 1),
        ]);

        assert_eq!(find(&grid, "a").row, 0);
        assert_eq!(find(&grid, "b").row, 1);
        assert_eq!(find(&grid, "c").row, 0);
        // row 0 column 1 is free, row 1 column 1 is covered by "b"
        assert_eq!(find(&grid, "d").row, 0);
    }

    #[test]
    fn test_effective_span_bounds() {
        for timeline in Timeline::ALL {
            for span in -2..=6 {
                let effective = effective_span(timeline, span);
                assert!((1..=3).contains(&effective));
                assert!(effective <= 3 - timeline.column());
                if (1..=3).contains(&span) {
                    assert_eq!(i64::from(effective), span.min(i64::from(3 - timeline.column())));
                }
            }
        }
    }

    #[test]
    fn test_no_overlap_and_deterministic_for_small_inputs() {
        let shapes: Vec<(Timeline, i64)> = Timeline::ALL
            .into_iter()
            .flat_map(|timeline| (1..=3).map(move |span| (timeline, span)))
            .collect();

        // every sequence of zero to four shapes, enumerated as base-9 numbers
        let mut sequences: Vec<Vec<(Timeline, i64)>> = Vec::new();
        for len in 0..=4u32 {
            for code in 0..shapes.len().pow(len) {
                let mut rest = code;
                let seq = (0..len)
                    .map(|_| {
                        let shape = shapes[rest % shapes.len()];
                        rest /= shapes.len();
                        shape
                    })
                    .collect();
                sequences.push(seq);
            }
        }

        for seq in &sequences {
            let requests: Vec<_> = seq
                .iter()
                .enumerate()
                .map(|(i, (timeline, span))| PlacementRequest {
                    item: i,
                    timeline: *timeline,
                    span: *span,
                })
                .collect();

            let grid = TimelineGrid::pack(requests.clone());
            let placements = grid.placements();
            assert_eq!(placements.len(), seq.len());

            for (i, a) in placements.iter().enumerate() {
                for b in &placements[i + 1..] {
                    if a.row == b.row {
                        let overlap = a.columns().any(|c| b.columns().contains(&c));
                        assert!(!overlap, "overlap in {:?}", seq);
                    }
                }
            }

            assert_eq!(TimelineGrid::pack(requests), grid);
        }
    }
}
