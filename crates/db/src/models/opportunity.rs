use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Number of timeline columns (SHORT, MID, LONG).
pub const TIMELINE_COLUMNS: u8 = 3;

/// Marketing funnel stage an opportunity (or scorecard) belongs to.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, TS, EnumString, Display,
    Default,
)]
#[sqlx(type_name = "opportunity_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Category {
    #[default]
    Foundation,
    Acquisition,
    Conversion,
    Retention,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Foundation,
        Category::Acquisition,
        Category::Conversion,
        Category::Retention,
    ];
}

/// Planning horizon. Doubles as the column index on the kanban board and the timeline grid.
#[derive(
    Debug,
    Clone,
    Copy,
    Type,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    TS,
    EnumString,
    Display,
    Default,
)]
#[sqlx(type_name = "opportunity_timeline", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Timeline {
    #[default]
    Short,
    Mid,
    Long,
}

impl Timeline {
    pub const ALL: [Timeline; 3] = [Timeline::Short, Timeline::Mid, Timeline::Long];

    pub fn column(self) -> u8 {
        match self {
            Timeline::Short => 0,
            Timeline::Mid => 1,
            Timeline::Long => 2,
        }
    }

    /// Out-of-range indices saturate to LONG.
    pub fn from_column(column: u8) -> Self {
        match column {
            0 => Timeline::Short,
            1 => Timeline::Mid,
            _ => Timeline::Long,
        }
    }

    /// Widest span a card starting in this column can have.
    pub fn max_span(self) -> u8 {
        TIMELINE_COLUMNS - self.column()
    }

    /// Clamp a requested span into `[1, 3 - column]`.
    pub fn clamp_span(self, span: i64) -> u8 {
        span.clamp(1, i64::from(self.max_span())) as u8
    }
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "opportunity_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OpportunityStatus {
    #[default]
    Idea,
    Planned,
    InProgress,
    Completed,
}

/// Source of opportunity creation
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "opportunity_source", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OpportunitySource {
    #[default]
    Manual,
    AiGenerated,
}

static SPAN_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*\[SPAN:(\d+)\]\s*").expect("span token pattern is valid")
});

/// Span encoded in a legacy `[SPAN:n]` description token, if any.
pub fn parse_span_token(description: &str) -> Option<i64> {
    SPAN_TOKEN
        .captures(description)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Description with every `[SPAN:n]` token removed.
pub fn strip_span_token(description: &str) -> String {
    SPAN_TOKEN.replace_all(description, " ").trim().to_string()
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Opportunity {
    pub id: Uuid,
    pub business_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub timeline: Timeline,
    pub span: Option<i32>,
    pub service_area: Option<String>,
    pub target_kpi: Option<String>,
    pub status: OpportunityStatus,
    pub source: OpportunitySource,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Opportunity {
    /// Span as stored: the `span` column, else a legacy description token, else 1.
    /// Not clamped against the current column.
    pub fn stored_span(&self) -> i64 {
        self.span
            .map(i64::from)
            .or_else(|| self.description.as_deref().and_then(parse_span_token))
            .unwrap_or(1)
    }

    /// Span clamped to the columns left from the current timeline.
    pub fn effective_span(&self) -> u8 {
        self.timeline.clamp_span(self.stored_span())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateOpportunity {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub timeline: Option<Timeline>,
    pub span: Option<i32>,
    pub service_area: Option<String>,
    pub target_kpi: Option<String>,
    pub status: Option<OpportunityStatus>,
    pub source: Option<OpportunitySource>,
}

impl CreateOpportunity {
    pub fn from_title(title: impl Into<String>, category: Category, timeline: Timeline) -> Self {
        Self {
            title: title.into(),
            description: None,
            category: Some(category),
            timeline: Some(timeline),
            span: None,
            service_area: None,
            target_kpi: None,
            status: None,
            source: None,
        }
    }
}

/// Manual edit of the free-form fields. Placement (timeline, span, order) goes through the planner.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
pub struct UpdateOpportunity {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub service_area: Option<String>,
    pub target_kpi: Option<String>,
    pub status: Option<OpportunityStatus>,
}

const OPPORTUNITY_COLUMNS: &str = "id, business_id, title, description, category, timeline, span, \
     service_area, target_kpi, status, source, sort_order, created_at, updated_at";

/// Split a written description into its text and any legacy span token it carried.
fn normalize_description(description: Option<&str>) -> (Option<String>, Option<i64>) {
    match description {
        Some(text) => {
            let token = parse_span_token(text);
            let stripped = strip_span_token(text);
            ((!stripped.is_empty()).then_some(stripped), token)
        }
        None => (None, None),
    }
}

impl Opportunity {
    pub async fn create(
        pool: &SqlitePool,
        business_id: Uuid,
        data: &CreateOpportunity,
        opportunity_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let timeline = data.timeline.unwrap_or_default();
        let (description, token_span) = normalize_description(data.description.as_deref());
        let span = data
            .span
            .map(i64::from)
            .or(token_span)
            .map(|s| i32::from(timeline.clamp_span(s)));

        sqlx::query_as::<_, Opportunity>(&format!(
            "INSERT INTO opportunities
                (id, business_id, title, description, category, timeline, span,
                 service_area, target_kpi, status, source, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                 (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM opportunities
                   WHERE business_id = $2 AND timeline = $6))
             RETURNING {OPPORTUNITY_COLUMNS}"
        ))
        .bind(opportunity_id)
        .bind(business_id)
        .bind(data.title.trim())
        .bind(description)
        .bind(data.category.unwrap_or_default())
        .bind(timeline)
        .bind(span)
        .bind(&data.service_area)
        .bind(&data.target_kpi)
        .bind(data.status.unwrap_or_default())
        .bind(data.source.unwrap_or_default())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Opportunity>(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// All opportunities of a business in board order.
    pub async fn find_by_business_id(
        pool: &SqlitePool,
        business_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Opportunity>(&format!(
            "SELECT {OPPORTUNITY_COLUMNS} FROM opportunities
             WHERE business_id = $1
             ORDER BY CASE timeline WHEN 'SHORT' THEN 0 WHEN 'MID' THEN 1 ELSE 2 END,
                      sort_order ASC, created_at ASC"
        ))
        .bind(business_id)
        .fetch_all(pool)
        .await
    }

    /// Ids in one kanban column, in board order.
    pub async fn find_column_ids<'e, E>(
        executor: E,
        business_id: Uuid,
        timeline: Timeline,
    ) -> Result<Vec<Uuid>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM opportunities
             WHERE business_id = $1 AND timeline = $2
             ORDER BY sort_order ASC, created_at ASC",
        )
        .bind(business_id)
        .bind(timeline)
        .fetch_all(executor)
        .await
    }

    /// Manual edit. When the `span` column is still empty, a legacy token from the new
    /// description, or else from the old one, is folded into it.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateOpportunity,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(existing) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let (old_description, old_token) = normalize_description(existing.description.as_deref());
        let (description, token_span) = match data.description.as_deref() {
            Some(text) => normalize_description(Some(text)),
            None => (old_description, None),
        };
        let span = existing
            .span
            .map(i64::from)
            .or(token_span)
            .or(old_token)
            .map(|s| i32::from(existing.timeline.clamp_span(s)));

        sqlx::query_as::<_, Opportunity>(&format!(
            "UPDATE opportunities
             SET title = COALESCE($2, title),
                 description = $3,
                 category = COALESCE($4, category),
                 service_area = COALESCE($5, service_area),
                 target_kpi = COALESCE($6, target_kpi),
                 status = COALESCE($7, status),
                 span = $8,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1
             RETURNING {OPPORTUNITY_COLUMNS}"
        ))
        .bind(id)
        .bind(data.title.as_deref().map(str::trim))
        .bind(description)
        .bind(data.category)
        .bind(&data.service_area)
        .bind(&data.target_kpi)
        .bind(data.status)
        .bind(span)
        .fetch_optional(pool)
        .await
    }

    pub async fn update_placement<'e, E>(
        executor: E,
        id: Uuid,
        timeline: Timeline,
        span: u8,
    ) -> Result<u64, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE opportunities
             SET timeline = $2, span = $3, updated_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .bind(timeline)
        .bind(i32::from(span))
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn update_sort_order<'e, E>(
        executor: E,
        id: Uuid,
        sort_order: i64,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        sqlx::query("UPDATE opportunities SET sort_order = $2 WHERE id = $1")
            .bind(id)
            .bind(sort_order)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM opportunities WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::business::{Business, CreateBusiness},
    };

    async fn seed_business(db: &DBService) -> Uuid {
        let data = CreateBusiness {
            name: "Northwind".to_string(),
            website: None,
            industry: None,
        };
        Business::create(&db.pool, &data, Uuid::new_v4())
            .await
            .unwrap()
            .id
    }

    #[test]
    fn test_clamp_span_respects_remaining_columns() {
        assert_eq!(Timeline::Short.clamp_span(3), 3);
        assert_eq!(Timeline::Mid.clamp_span(3), 2);
        assert_eq!(Timeline::Long.clamp_span(2), 1);
        assert_eq!(Timeline::Short.clamp_span(0), 1);
        assert_eq!(Timeline::Short.clamp_span(-4), 1);
    }

    #[test]
    fn test_timeline_column_round_trip_and_parse() {
        for timeline in Timeline::ALL {
            assert_eq!(Timeline::from_column(timeline.column()), timeline);
        }
        assert_eq!("mid".parse::<Timeline>().unwrap(), Timeline::Mid);
        assert_eq!(Timeline::Long.to_string(), "LONG");
        assert_eq!("Retention".parse::<Category>().unwrap(), Category::Retention);
    }

    #[test]
    fn test_span_token_parse_and_strip() {
        assert_eq!(parse_span_token("Launch ads [SPAN:2]"), Some(2));
        assert_eq!(parse_span_token("no token here"), None);
        assert_eq!(strip_span_token("Launch [SPAN:2] ads"), "Launch ads");
        assert_eq!(strip_span_token("[SPAN:3]"), "");
    }

    #[tokio::test]
    async fn test_create_folds_span_token_into_column() {
        let db = DBService::new_in_memory().await.unwrap();
        let business_id = seed_business(&db).await;

        let mut data = CreateOpportunity::from_title("SEO audit", Category::Foundation, Timeline::Mid);
        data.description = Some("Crawl and fix [SPAN:3]".to_string());
        let created = Opportunity::create(&db.pool, business_id, &data, Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(created.description.as_deref(), Some("Crawl and fix"));
        assert_eq!(created.span, Some(2));
        assert_eq!(created.effective_span(), 2);
    }

    #[tokio::test]
    async fn test_create_appends_to_end_of_column() {
        let db = DBService::new_in_memory().await.unwrap();
        let business_id = seed_business(&db).await;

        for title in ["a", "b", "c"] {
            let data = CreateOpportunity::from_title(title, Category::Acquisition, Timeline::Short);
            Opportunity::create(&db.pool, business_id, &data, Uuid::new_v4())
                .await
                .unwrap();
        }
        let other = CreateOpportunity::from_title("d", Category::Acquisition, Timeline::Long);
        let long = Opportunity::create(&db.pool, business_id, &other, Uuid::new_v4())
            .await
            .unwrap();

        let all = Opportunity::find_by_business_id(&db.pool, business_id).await.unwrap();
        let orders: Vec<(String, i64)> = all.iter().map(|o| (o.title.clone(), o.sort_order)).collect();
        assert_eq!(
            orders,
            vec![
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 2),
                ("d".to_string(), 0)
            ]
        );
        assert_eq!(long.sort_order, 0);
    }

    #[test]
    fn test_legacy_token_only_used_without_column() {
        let now = Utc::now();
        let mut opportunity = Opportunity {
            id: Uuid::new_v4(),
            business_id: Uuid::new_v4(),
            title: "Email nurture".to_string(),
            description: Some("Drip sequence [SPAN:3]".to_string()),
            category: Category::Retention,
            timeline: Timeline::Short,
            span: None,
            service_area: None,
            target_kpi: None,
            status: OpportunityStatus::Planned,
            source: OpportunitySource::Manual,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(opportunity.stored_span(), 3);

        opportunity.span = Some(1);
        assert_eq!(opportunity.stored_span(), 1);

        opportunity.span = None;
        opportunity.description = None;
        assert_eq!(opportunity.stored_span(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_column_span_over_new_token() {
        let db = DBService::new_in_memory().await.unwrap();
        let business_id = seed_business(&db).await;

        let mut data = CreateOpportunity::from_title("PPC", Category::Acquisition, Timeline::Short);
        data.span = Some(2);
        let created = Opportunity::create(&db.pool, business_id, &data, Uuid::new_v4())
            .await
            .unwrap();

        let updated = Opportunity::update(
            &db.pool,
            created.id,
            &UpdateOpportunity {
                description: Some("Bid tuning [SPAN:3]".to_string()),
                status: Some(OpportunityStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.span, Some(2));
        assert_eq!(updated.description.as_deref(), Some("Bid tuning"));
        assert_eq!(updated.status, OpportunityStatus::InProgress);
        assert_eq!(updated.title, "PPC");
    }

    async fn insert_legacy(db: &DBService, business_id: Uuid, description: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO opportunities (id, business_id, title, description, category, timeline)
             VALUES ($1, $2, 'Email nurture', $3, 'retention', 'SHORT')",
        )
        .bind(id)
        .bind(business_id)
        .bind(description)
        .execute(&db.pool)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_description_edit_folds_legacy_token_into_column() {
        let db = DBService::new_in_memory().await.unwrap();
        let business_id = seed_business(&db).await;
        let id = insert_legacy(&db, business_id, "Drip [SPAN:3]").await;

        let before = Opportunity::find_by_id(&db.pool, id).await.unwrap().unwrap();
        assert_eq!(before.span, None);
        assert_eq!(before.stored_span(), 3);

        let updated = Opportunity::update(
            &db.pool,
            id,
            &UpdateOpportunity {
                description: Some("Drip sequence v2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.description.as_deref(), Some("Drip sequence v2"));
        assert_eq!(updated.span, Some(3));
        assert_eq!(updated.stored_span(), 3);
    }

    #[tokio::test]
    async fn test_unrelated_edit_moves_legacy_token_out_of_description() {
        let db = DBService::new_in_memory().await.unwrap();
        let business_id = seed_business(&db).await;
        let id = insert_legacy(&db, business_id, "Drip [SPAN:2]").await;

        let updated = Opportunity::update(
            &db.pool,
            id,
            &UpdateOpportunity {
                status: Some(OpportunityStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(updated.description.as_deref(), Some("Drip"));
        assert_eq!(updated.span, Some(2));
    }

    #[tokio::test]
    async fn test_delete_cascade_removes_owned_rows() {
        let db = DBService::new_in_memory().await.unwrap();
        let business_id = seed_business(&db).await;
        for title in ["x", "y"] {
            let data = CreateOpportunity::from_title(title, Category::Conversion, Timeline::Mid);
            Opportunity::create(&db.pool, business_id, &data, Uuid::new_v4())
                .await
                .unwrap();
        }

        let deletion = Business::delete_cascade(&db.pool, business_id).await.unwrap();
        assert_eq!(deletion.opportunities, 2);
        assert_eq!(deletion.businesses, 1);
        assert!(
            Opportunity::find_by_business_id(&db.pool, business_id)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
