use chrono::{DateTime, Utc};
use db::models::{business::Business, opportunity::Category, scorecard::Scorecard};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use super::scorecard_highlights::{AiBatch, HighlightsDocument, ScoreDefaults, SignalTrend};

#[derive(Debug, Error)]
pub enum ScorecardError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to serialize scorecard: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("business not found")]
    BusinessNotFound,
    #[error("highlight not found")]
    HighlightNotFound,
    #[error("validation error: {0}")]
    Validation(String),
}

/// A category's document, always in the current shape.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ScorecardDocument {
    pub business_id: Uuid,
    pub category: Category,
    pub document: HighlightsDocument,
    /// `None` until the scorecard is first written.
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct NewHighlight {
    pub text: String,
    pub service_area: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct NewMetricSignal {
    pub metric: String,
    #[serde(default)]
    pub trend: SignalTrend,
    pub note: Option<String>,
}

/// AI results for one bucket.
#[derive(Debug, Clone, Deserialize, TS)]
pub struct CategoryBatch {
    pub category: Category,
    pub batch: AiBatch,
}

fn defaults_for(row: Option<&Scorecard>) -> ScoreDefaults {
    ScoreDefaults {
        score: row.and_then(|r| r.score),
        max_score: row.and_then(|r| r.max_score),
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), ScorecardError> {
    if value.trim().is_empty() {
        return Err(ScorecardError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

pub struct ScorecardService {
    pool: SqlitePool,
}

impl ScorecardService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn ensure_business(&self, business_id: Uuid) -> Result<(), ScorecardError> {
        Business::find_by_id(&self.pool, business_id)
            .await?
            .ok_or(ScorecardError::BusinessNotFound)?;
        Ok(())
    }

    async fn load(
        &self,
        business_id: Uuid,
        category: Category,
    ) -> Result<ScorecardDocument, ScorecardError> {
        let row =
            Scorecard::find_by_business_and_category(&self.pool, business_id, category).await?;
        Ok(Self::to_document(business_id, category, row.as_ref()))
    }

    fn to_document(
        business_id: Uuid,
        category: Category,
        row: Option<&Scorecard>,
    ) -> ScorecardDocument {
        let document =
            HighlightsDocument::from_stored(row.and_then(|r| r.highlights.as_deref()), defaults_for(row));
        ScorecardDocument {
            business_id,
            category,
            document,
            updated_at: row.map(|r| r.updated_at),
        }
    }

    async fn save(
        &self,
        business_id: Uuid,
        category: Category,
        document: HighlightsDocument,
    ) -> Result<ScorecardDocument, ScorecardError> {
        let stored = document.to_stored()?;
        let row = Scorecard::save_highlights(
            &self.pool,
            business_id,
            category,
            &stored,
            document.score,
            document.max_score,
        )
        .await?;
        Ok(ScorecardDocument {
            business_id,
            category,
            document,
            updated_at: Some(row.updated_at),
        })
    }

    /// Read one category. A missing row reads as the empty document and is not created.
    pub async fn get_document(
        &self,
        business_id: Uuid,
        category: Category,
    ) -> Result<ScorecardDocument, ScorecardError> {
        self.ensure_business(business_id).await?;
        self.load(business_id, category).await
    }

    /// All four categories in board order.
    pub async fn list_documents(
        &self,
        business_id: Uuid,
    ) -> Result<Vec<ScorecardDocument>, ScorecardError> {
        self.ensure_business(business_id).await?;
        let rows = Scorecard::find_by_business_id(&self.pool, business_id).await?;
        Ok(Category::ALL
            .into_iter()
            .map(|category| {
                let row = rows.iter().find(|r| r.category == category);
                Self::to_document(business_id, category, row)
            })
            .collect())
    }

    pub async fn add_highlight(
        &self,
        business_id: Uuid,
        category: Category,
        highlight: NewHighlight,
    ) -> Result<ScorecardDocument, ScorecardError> {
        non_empty("text", &highlight.text)?;
        let mut current = self.get_document(business_id, category).await?;
        let service_area = highlight
            .service_area
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        let id = current
            .document
            .add_highlight(&highlight.text, service_area)
            .id
            .clone();
        debug!(business_id = %business_id, category = %category, highlight_id = %id, "Added highlight");
        self.save(business_id, category, current.document).await
    }

    pub async fn remove_highlight(
        &self,
        business_id: Uuid,
        category: Category,
        highlight_id: &str,
    ) -> Result<ScorecardDocument, ScorecardError> {
        let mut current = self.get_document(business_id, category).await?;
        if !current.document.remove_highlight(highlight_id) {
            return Err(ScorecardError::HighlightNotFound);
        }
        self.save(business_id, category, current.document).await
    }

    pub async fn add_metric_signal(
        &self,
        business_id: Uuid,
        category: Category,
        signal: NewMetricSignal,
    ) -> Result<ScorecardDocument, ScorecardError> {
        non_empty("metric", &signal.metric)?;
        let mut current = self.get_document(business_id, category).await?;
        current
            .document
            .add_metric_signal(&signal.metric, signal.trend, signal.note);
        self.save(business_id, category, current.document).await
    }

    /// Merge AI results bucket by bucket. Each bucket is saved on its own, so a failure
    /// stops the loop and leaves the buckets before it committed.
    pub async fn apply_ai_batches(
        &self,
        business_id: Uuid,
        batches: Vec<CategoryBatch>,
    ) -> Result<Vec<ScorecardDocument>, ScorecardError> {
        self.ensure_business(business_id).await?;
        let mut saved = Vec::with_capacity(batches.len());
        for CategoryBatch { category, batch } in batches {
            let mut current = self.load(business_id, category).await?;
            current.document.merge_ai_batch(batch);
            saved.push(self.save(business_id, category, current.document).await?);
        }
        info!(
            business_id = %business_id,
            buckets = saved.len(),
            "Applied AI scorecard batches"
        );
        Ok(saved)
    }
}
