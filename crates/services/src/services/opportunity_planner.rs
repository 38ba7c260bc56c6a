//! Service applying timeline placement changes (move, resize, reorder) to opportunities.

use db::models::{
    business::Business,
    opportunity::{Opportunity, Timeline},
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use super::opportunity_board::OpportunityBoard;

#[derive(Debug, Error)]
pub enum OpportunityPlannerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("opportunity not found")]
    NotFound,
    #[error("business not found")]
    BusinessNotFound,
    #[error("invalid reorder: {0}")]
    InvalidReorder(String),
}

/// A placement change coming from the board, the timeline, or a finished pointer gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlannerCommand {
    /// Move to another column. `position` is the index in the target kanban column;
    /// `None` appends when the column changes and keeps the current slot otherwise.
    MoveTo {
        timeline: Timeline,
        position: Option<u32>,
    },
    /// Change how many columns the card covers. Clamped to `[1, 3 - column]`.
    Resize { span: i64 },
}

pub struct OpportunityPlanner {
    pool: SqlitePool,
}

impl OpportunityPlanner {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn apply(
        &self,
        opportunity_id: Uuid,
        command: PlannerCommand,
    ) -> Result<Opportunity, OpportunityPlannerError> {
        match command {
            PlannerCommand::MoveTo { timeline, position } => {
                self.move_to(opportunity_id, timeline, position.map(|p| p as usize))
                    .await
            }
            PlannerCommand::Resize { span } => self.resize(opportunity_id, span).await,
        }
    }

    /// Move an opportunity to `timeline`, re-clamping its span to the new column and
    /// renumbering both affected kanban columns in one transaction.
    pub async fn move_to(
        &self,
        opportunity_id: Uuid,
        timeline: Timeline,
        position: Option<usize>,
    ) -> Result<Opportunity, OpportunityPlannerError> {
        let existing = Opportunity::find_by_id(&self.pool, opportunity_id)
            .await?
            .ok_or(OpportunityPlannerError::NotFound)?;
        let span = timeline.clamp_span(existing.stored_span());
        let changed_column = existing.timeline != timeline;

        let mut tx = self.pool.begin().await?;
        Opportunity::update_placement(&mut *tx, opportunity_id, timeline, span).await?;

        let mut target_ids =
            Opportunity::find_column_ids(&mut *tx, existing.business_id, timeline).await?;
        let current_slot = target_ids.iter().position(|id| *id == opportunity_id);
        if let Some(slot) = current_slot {
            target_ids.remove(slot);
        }
        let slot = match (position, current_slot) {
            (Some(position), _) => position.min(target_ids.len()),
            (None, Some(slot)) if !changed_column => slot,
            _ => target_ids.len(),
        };
        target_ids.insert(slot, opportunity_id);
        for (index, id) in target_ids.iter().enumerate() {
            Opportunity::update_sort_order(&mut *tx, *id, index as i64).await?;
        }

        if changed_column {
            let source_ids =
                Opportunity::find_column_ids(&mut *tx, existing.business_id, existing.timeline)
                    .await?;
            for (index, id) in source_ids.iter().enumerate() {
                Opportunity::update_sort_order(&mut *tx, *id, index as i64).await?;
            }
        }

        tx.commit().await?;

        info!(
            opportunity_id = %opportunity_id,
            from = %existing.timeline,
            to = %timeline,
            slot = slot,
            span = span,
            "Moved opportunity"
        );

        Opportunity::find_by_id(&self.pool, opportunity_id)
            .await?
            .ok_or(OpportunityPlannerError::NotFound)
    }

    /// Set the span, clamped silently to what fits from the current column.
    pub async fn resize(
        &self,
        opportunity_id: Uuid,
        span: i64,
    ) -> Result<Opportunity, OpportunityPlannerError> {
        let existing = Opportunity::find_by_id(&self.pool, opportunity_id)
            .await?
            .ok_or(OpportunityPlannerError::NotFound)?;
        let clamped = existing.timeline.clamp_span(span);
        if i64::from(clamped) != span {
            debug!(
                opportunity_id = %opportunity_id,
                requested = span,
                clamped = clamped,
                "Span clamped to remaining columns"
            );
        }

        Opportunity::update_placement(&self.pool, opportunity_id, existing.timeline, clamped)
            .await?;

        Opportunity::find_by_id(&self.pool, opportunity_id)
            .await?
            .ok_or(OpportunityPlannerError::NotFound)
    }

    /// Rewrite the order of one kanban column. `ordered_ids` must list exactly the
    /// opportunities currently in that column.
    pub async fn reorder_column(
        &self,
        business_id: Uuid,
        timeline: Timeline,
        ordered_ids: &[Uuid],
    ) -> Result<OpportunityBoard, OpportunityPlannerError> {
        let mut tx = self.pool.begin().await?;
        let mut current = Opportunity::find_column_ids(&mut *tx, business_id, timeline).await?;
        let mut requested = ordered_ids.to_vec();
        current.sort();
        requested.sort();
        if current != requested {
            return Err(OpportunityPlannerError::InvalidReorder(format!(
                "expected the {} opportunities in {}, got {} ids",
                current.len(),
                timeline,
                ordered_ids.len()
            )));
        }

        for (index, id) in ordered_ids.iter().enumerate() {
            Opportunity::update_sort_order(&mut *tx, *id, index as i64).await?;
        }
        tx.commit().await?;

        self.board(business_id).await
    }

    pub async fn board(&self, business_id: Uuid) -> Result<OpportunityBoard, OpportunityPlannerError> {
        Business::find_by_id(&self.pool, business_id)
            .await?
            .ok_or(OpportunityPlannerError::BusinessNotFound)?;
        let opportunities = Opportunity::find_by_business_id(&self.pool, business_id).await?;
        Ok(OpportunityBoard::derive(business_id, &opportunities))
    }
}
