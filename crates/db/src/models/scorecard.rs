use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

use super::opportunity::Category;

/// One scorecard per (business, category). `highlights` is a free-form JSON document;
/// its shape is owned by the scorecard service, not the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Scorecard {
    pub id: Uuid,
    pub business_id: Uuid,
    pub category: Category,
    pub highlights: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SCORECARD_COLUMNS: &str =
    "id, business_id, category, highlights, score, max_score, created_at, updated_at";

impl Scorecard {
    pub async fn find_by_business_and_category(
        pool: &SqlitePool,
        business_id: Uuid,
        category: Category,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Scorecard>(&format!(
            "SELECT {SCORECARD_COLUMNS} FROM scorecards WHERE business_id = $1 AND category = $2"
        ))
        .bind(business_id)
        .bind(category)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_business_id(
        pool: &SqlitePool,
        business_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Scorecard>(&format!(
            "SELECT {SCORECARD_COLUMNS} FROM scorecards
             WHERE business_id = $1
             ORDER BY CASE category
                 WHEN 'foundation' THEN 0 WHEN 'acquisition' THEN 1
                 WHEN 'conversion' THEN 2 ELSE 3 END"
        ))
        .bind(business_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the highlights document and mirror its score columns. Last writer wins.
    pub async fn save_highlights(
        pool: &SqlitePool,
        business_id: Uuid,
        category: Category,
        highlights: &str,
        score: f64,
        max_score: f64,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Scorecard>(&format!(
            "INSERT INTO scorecards (id, business_id, category, highlights, score, max_score)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT(business_id, category) DO UPDATE SET
                 highlights = excluded.highlights,
                 score = excluded.score,
                 max_score = excluded.max_score,
                 updated_at = datetime('now', 'subsec')
             RETURNING {SCORECARD_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(business_id)
        .bind(category)
        .bind(highlights)
        .bind(score)
        .bind(max_score)
        .fetch_one(pool)
        .await
    }
}
