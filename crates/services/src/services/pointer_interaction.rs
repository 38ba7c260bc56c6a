//! Drag-to-move and drag-to-resize gestures on the timeline.
//!
//! A gesture is `Idle -> Dragging -> Idle` or `Idle -> Resizing -> Idle`; only one card
//! can be in a gesture at a time. Pointer moves only produce previews. The board is
//! changed once, by the [`PlannerCommand`] committed on release, and only when the
//! final value differs from where the gesture started. `cancel` drops the gesture.

use db::models::opportunity::{TIMELINE_COLUMNS, Timeline};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use super::{opportunity_planner::PlannerCommand, timeline_layout::effective_span};

/// Fraction of a column the pointer must travel to grow or shrink a card by one.
const RESIZE_STEP_RATIO: f64 = 0.8;

/// Horizontal extent of the timeline container, in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
pub struct TimelineGeometry {
    pub left: f64,
    pub width: f64,
}

impl TimelineGeometry {
    pub fn column_width(&self) -> f64 {
        self.width / f64::from(TIMELINE_COLUMNS)
    }

    /// Column under `x`, splitting the container into thirds. Positions outside the
    /// container clamp to the nearest edge column.
    pub fn column_at(&self, x: f64) -> Option<Timeline> {
        let width = self.column_width();
        if !(width.is_finite() && width > 0.0 && x.is_finite()) {
            return None;
        }
        let index = ((x - self.left) / width).floor();
        let index = index.clamp(0.0, f64::from(TIMELINE_COLUMNS - 1));
        Some(Timeline::from_column(index as u8))
    }
}

/// The card a gesture starts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct CardHandle {
    pub opportunity_id: Uuid,
    pub timeline: Timeline,
    pub span: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
pub enum PressTarget {
    Body,
    ResizeHandle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    Dragging {
        opportunity_id: Uuid,
        origin: Timeline,
        current: Timeline,
    },
    Resizing {
        opportunity_id: Uuid,
        timeline: Timeline,
        start_x: f64,
        start_span: u8,
        current: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum InteractionEffect {
    /// Show the card in another column; nothing is persisted.
    PreviewMove {
        opportunity_id: Uuid,
        timeline: Timeline,
    },
    /// Show the card with another span; nothing is persisted.
    PreviewResize { opportunity_id: Uuid, span: u8 },
    /// Persist the finished gesture.
    Commit {
        opportunity_id: Uuid,
        command: PlannerCommand,
    },
    /// Gesture ended without a change; drop any preview.
    Revert { opportunity_id: Uuid },
}

#[derive(Debug, Clone)]
pub struct PointerInteraction {
    geometry: TimelineGeometry,
    state: InteractionState,
}

impl PointerInteraction {
    pub fn new(geometry: TimelineGeometry) -> Self {
        Self {
            geometry,
            state: InteractionState::Idle,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, InteractionState::Idle)
    }

    /// Start a gesture. Ignored (returns `false`) while another gesture is active.
    pub fn press(&mut self, card: CardHandle, target: PressTarget, x: f64) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.state = match target {
            PressTarget::Body => InteractionState::Dragging {
                opportunity_id: card.opportunity_id,
                origin: card.timeline,
                current: card.timeline,
            },
            PressTarget::ResizeHandle => {
                let span = effective_span(card.timeline, card.span);
                InteractionState::Resizing {
                    opportunity_id: card.opportunity_id,
                    timeline: card.timeline,
                    start_x: x,
                    start_span: span,
                    current: span,
                }
            }
        };
        true
    }

    /// Track the pointer. Returns a preview only when the derived column or span changes.
    pub fn pointer_move(&mut self, x: f64) -> Option<InteractionEffect> {
        let geometry = self.geometry;
        match &mut self.state {
            InteractionState::Idle => None,
            InteractionState::Dragging {
                opportunity_id,
                current,
                ..
            } => {
                let column = geometry.column_at(x)?;
                if column == *current {
                    return None;
                }
                *current = column;
                Some(InteractionEffect::PreviewMove {
                    opportunity_id: *opportunity_id,
                    timeline: column,
                })
            }
            InteractionState::Resizing {
                opportunity_id,
                timeline,
                start_x,
                start_span,
                current,
            } => {
                let step = geometry.column_width() * RESIZE_STEP_RATIO;
                if !(step.is_finite() && step > 0.0 && x.is_finite()) {
                    return None;
                }
                let delta = ((x - *start_x) / step).round() as i64;
                let span = timeline.clamp_span(i64::from(*start_span) + delta);
                if span == *current {
                    return None;
                }
                *current = span;
                Some(InteractionEffect::PreviewResize {
                    opportunity_id: *opportunity_id,
                    span,
                })
            }
        }
    }

    /// Finish the gesture. Commits only a real change; otherwise reverts the preview.
    pub fn release(&mut self) -> Option<InteractionEffect> {
        match std::mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::Idle => None,
            InteractionState::Dragging {
                opportunity_id,
                origin,
                current,
            } => Some(if origin == current {
                InteractionEffect::Revert { opportunity_id }
            } else {
                InteractionEffect::Commit {
                    opportunity_id,
                    command: PlannerCommand::MoveTo {
                        timeline: current,
                        position: None,
                    },
                }
            }),
            InteractionState::Resizing {
                opportunity_id,
                start_span,
                current,
                ..
            } => Some(if start_span == current {
                InteractionEffect::Revert { opportunity_id }
            } else {
                InteractionEffect::Commit {
                    opportunity_id,
                    command: PlannerCommand::Resize {
                        span: i64::from(current),
                    },
                }
            }),
        }
    }

    /// Abort the gesture (Escape, pointer lost). Never commits.
    pub fn cancel(&mut self) -> Option<InteractionEffect> {
        match std::mem::replace(&mut self.state, InteractionState::Idle) {
            InteractionState::Idle => None,
            InteractionState::Dragging { opportunity_id, .. }
            | InteractionState::Resizing { opportunity_id, .. } => {
                Some(InteractionEffect::Revert { opportunity_id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOMETRY: TimelineGeometry = TimelineGeometry {
        left: 100.0,
        width: 900.0,
    };

    fn card(timeline: Timeline, span: i64) -> CardHandle {
        CardHandle {
            opportunity_id: Uuid::nil(),
            timeline,
            span,
        }
    }

    #[test]
    fn test_column_at_splits_into_thirds_and_clamps() {
        assert_eq!(GEOMETRY.column_at(100.0), Some(Timeline::Short));
        assert_eq!(GEOMETRY.column_at(399.0), Some(Timeline::Short));
        assert_eq!(GEOMETRY.column_at(400.0), Some(Timeline::Mid));
        assert_eq!(GEOMETRY.column_at(750.0), Some(Timeline::Long));
        assert_eq!(GEOMETRY.column_at(-50.0), Some(Timeline::Short));
        assert_eq!(GEOMETRY.column_at(5000.0), Some(Timeline::Long));

        let collapsed = TimelineGeometry {
            left: 0.0,
            width: 0.0,
        };
        assert_eq!(collapsed.column_at(10.0), None);
    }

    #[test]
    fn test_drag_previews_each_crossing_and_commits_once() {
        let mut interaction = PointerInteraction::new(GEOMETRY);
        assert!(interaction.press(card(Timeline::Short, 1), PressTarget::Body, 150.0));

        assert_eq!(interaction.pointer_move(200.0), None);
        assert!(matches!(
            interaction.pointer_move(500.0),
            Some(InteractionEffect::PreviewMove {
                timeline: Timeline::Mid,
                ..
            })
        ));
        assert_eq!(interaction.pointer_move(520.0), None);
        assert!(matches!(
            interaction.pointer_move(800.0),
            Some(InteractionEffect::PreviewMove {
                timeline: Timeline::Long,
                ..
            })
        ));

        let effect = interaction.release();
        assert_eq!(
            effect,
            Some(InteractionEffect::Commit {
                opportunity_id: Uuid::nil(),
                command: PlannerCommand::MoveTo {
                    timeline: Timeline::Long,
                    position: None,
                },
            })
        );
        assert!(interaction.is_idle());
    }

    #[test]
    fn test_drag_back_to_origin_reverts() {
        let mut interaction = PointerInteraction::new(GEOMETRY);
        interaction.press(card(Timeline::Mid, 1), PressTarget::Body, 500.0);
        interaction.pointer_move(800.0);
        interaction.pointer_move(500.0);
        assert_eq!(
            interaction.release(),
            Some(InteractionEffect::Revert {
                opportunity_id: Uuid::nil()
            })
        );
    }

    #[test]
    fn test_resize_steps_at_eighty_percent_of_a_column() {
        // column width 300, step 240
        let mut interaction = PointerInteraction::new(GEOMETRY);
        interaction.press(card(Timeline::Short, 1), PressTarget::ResizeHandle, 300.0);

        assert_eq!(interaction.pointer_move(410.0), None);
        assert_eq!(
            interaction.pointer_move(430.0),
            Some(InteractionEffect::PreviewResize {
                opportunity_id: Uuid::nil(),
                span: 2
            })
        );
        assert_eq!(
            interaction.pointer_move(2000.0),
            Some(InteractionEffect::PreviewResize {
                opportunity_id: Uuid::nil(),
                span: 3
            })
        );
        assert_eq!(
            interaction.release(),
            Some(InteractionEffect::Commit {
                opportunity_id: Uuid::nil(),
                command: PlannerCommand::Resize { span: 3 },
            })
        );
    }

    #[test]
    fn test_resize_clamps_to_column_and_floor_of_one() {
        let mut interaction = PointerInteraction::new(GEOMETRY);
        interaction.press(card(Timeline::Mid, 2), PressTarget::ResizeHandle, 700.0);

        // already at the widest span for MID
        assert_eq!(interaction.pointer_move(1500.0), None);
        assert_eq!(
            interaction.pointer_move(0.0),
            Some(InteractionEffect::PreviewResize {
                opportunity_id: Uuid::nil(),
                span: 1
            })
        );
    }

    #[test]
    fn test_stale_span_is_clamped_on_press() {
        let mut interaction = PointerInteraction::new(GEOMETRY);
        interaction.press(card(Timeline::Long, 3), PressTarget::ResizeHandle, 900.0);
        assert!(matches!(
            interaction.state(),
            InteractionState::Resizing { start_span: 1, .. }
        ));
        assert_eq!(
            interaction.release(),
            Some(InteractionEffect::Revert {
                opportunity_id: Uuid::nil()
            })
        );
    }

    #[test]
    fn test_cancel_never_commits_and_press_is_exclusive() {
        let mut interaction = PointerInteraction::new(GEOMETRY);
        assert!(interaction.press(card(Timeline::Short, 1), PressTarget::Body, 150.0));
        assert!(!interaction.press(card(Timeline::Mid, 1), PressTarget::ResizeHandle, 500.0));

        interaction.pointer_move(800.0);
        assert_eq!(
            interaction.cancel(),
            Some(InteractionEffect::Revert {
                opportunity_id: Uuid::nil()
            })
        );
        assert!(interaction.is_idle());
        assert_eq!(interaction.release(), None);
        assert_eq!(interaction.pointer_move(300.0), None);
    }
}
