use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// A client workspace managed by the agency.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Business {
    pub id: Uuid,
    pub name: String,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateBusiness {
    pub name: String,
    pub website: Option<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateBusiness {
    pub name: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
}

/// Rows removed by a cascading business delete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
pub struct BusinessDeletion {
    pub opportunities: u64,
    pub scorecards: u64,
    pub businesses: u64,
}

const BUSINESS_COLUMNS: &str = "id, name, website, industry, created_at, updated_at";

impl Business {
    pub async fn create(
        pool: &SqlitePool,
        data: &CreateBusiness,
        business_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Business>(&format!(
            "INSERT INTO businesses (id, name, website, industry)
             VALUES ($1, $2, $3, $4)
             RETURNING {BUSINESS_COLUMNS}"
        ))
        .bind(business_id)
        .bind(data.name.trim())
        .bind(&data.website)
        .bind(&data.industry)
        .fetch_one(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Business>(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses ORDER BY name COLLATE NOCASE ASC"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Business>(&format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Fields left as `None` keep their stored value.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateBusiness,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Business>(&format!(
            "UPDATE businesses
             SET name = COALESCE($2, name),
                 website = COALESCE($3, website),
                 industry = COALESCE($4, industry),
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {BUSINESS_COLUMNS}"
        ))
        .bind(id)
        .bind(data.name.as_deref().map(str::trim))
        .bind(&data.website)
        .bind(&data.industry)
        .fetch_optional(pool)
        .await
    }

    /// Delete a business and everything it owns in one transaction. Any failure rolls
    /// the whole delete back.
    pub async fn delete_cascade(pool: &SqlitePool, id: Uuid) -> Result<BusinessDeletion, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let opportunities = sqlx::query("DELETE FROM opportunities WHERE business_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let scorecards = sqlx::query("DELETE FROM scorecards WHERE business_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let businesses = sqlx::query("DELETE FROM businesses WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(BusinessDeletion {
            opportunities,
            scorecards,
            businesses,
        })
    }
}
