//! Kanban and timeline views of one business's opportunities.
//!
//! Both views are derived from the same list, and only the `timeline` field decides which
//! column a card sits in. Nothing here mutates; moves go through the planner and the board
//! is derived again afterwards.

use db::models::opportunity::{Category, Opportunity, Timeline};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::timeline_layout::{GridCell, PlacementRequest, TimelineGrid};

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct KanbanColumn {
    pub timeline: Timeline,
    pub opportunities: Vec<Opportunity>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineCell {
    Empty,
    Start {
        opportunity_id: Uuid,
        title: String,
        span: u8,
    },
    Occupied,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CategoryTimeline {
    pub category: Category,
    pub rows: Vec<Vec<TimelineCell>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct OpportunityBoard {
    pub business_id: Uuid,
    pub kanban: Vec<KanbanColumn>,
    pub timeline: Vec<CategoryTimeline>,
}

/// Board order: column, then position in the column, then age. The id breaks ties so the
/// order is total.
fn board_order(a: &Opportunity, b: &Opportunity) -> std::cmp::Ordering {
    a.timeline
        .cmp(&b.timeline)
        .then(a.sort_order.cmp(&b.sort_order))
        .then(a.created_at.cmp(&b.created_at))
        .then(a.id.cmp(&b.id))
}

impl OpportunityBoard {
    pub fn derive(business_id: Uuid, opportunities: &[Opportunity]) -> Self {
        let mut ordered: Vec<&Opportunity> = opportunities.iter().collect();
        ordered.sort_by(|a, b| board_order(a, b));

        let kanban = Timeline::ALL
            .into_iter()
            .map(|timeline| KanbanColumn {
                timeline,
                opportunities: ordered
                    .iter()
                    .filter(|o| o.timeline == timeline)
                    .map(|o| (*o).clone())
                    .collect(),
            })
            .collect();

        let timeline = Category::ALL
            .into_iter()
            .map(|category| {
                let requests = ordered
                    .iter()
                    .filter(|o| o.category == category)
                    .map(|o| PlacementRequest {
                        item: *o,
                        timeline: o.timeline,
                        span: o.stored_span(),
                    });
                CategoryTimeline {
                    category,
                    rows: TimelineGrid::pack(requests)
                        .into_visible_rows()
                        .into_iter()
                        .map(|row| row.into_iter().map(TimelineCell::from).collect())
                        .collect(),
                }
            })
            .collect();

        OpportunityBoard {
            business_id,
            kanban,
            timeline,
        }
    }

    pub fn column(&self, timeline: Timeline) -> &[Opportunity] {
        self.kanban
            .iter()
            .find(|c| c.timeline == timeline)
            .map(|c| c.opportunities.as_slice())
            .unwrap_or(&[])
    }

    pub fn category(&self, category: Category) -> Option<&CategoryTimeline> {
        self.timeline.iter().find(|c| c.category == category)
    }
}

impl From<GridCell<&Opportunity>> for TimelineCell {
    fn from(cell: GridCell<&Opportunity>) -> Self {
        match cell {
            GridCell::Empty => TimelineCell::Empty,
            GridCell::Occupied => TimelineCell::Occupied,
            GridCell::Start { item, span } => TimelineCell::Start {
                opportunity_id: item.id,
                title: item.title.clone(),
                span,
            },
        }
    }
}
