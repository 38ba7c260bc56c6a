use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::{
    business::Business,
    opportunity::{CreateOpportunity, Opportunity, Timeline, UpdateOpportunity},
};
use serde::Deserialize;
use services::services::{
    opportunity_board::OpportunityBoard,
    opportunity_planner::{OpportunityPlanner, PlannerCommand},
};
use tracing::info;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, ApiPath},
};

#[derive(Debug, Deserialize, TS)]
pub struct ReorderColumn {
    pub timeline: Timeline,
    pub opportunity_ids: Vec<Uuid>,
}

async fn require_business(deployment: &DeploymentImpl, business_id: Uuid) -> Result<(), ApiError> {
    Business::find_by_id(&deployment.db().pool, business_id)
        .await?
        .ok_or(ApiError::NotFound("business"))?;
    Ok(())
}

fn require_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::BadRequest("Opportunity title is required".to_string()));
    }
    Ok(())
}

/// GET /api/businesses/{business_id}/opportunities
/// List opportunities in board order
pub async fn get_opportunities(
    State(deployment): State<DeploymentImpl>,
    ApiPath(business_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Opportunity>>>, ApiError> {
    require_business(&deployment, business_id).await?;
    let opportunities = Opportunity::find_by_business_id(&deployment.db().pool, business_id).await?;
    Ok(ResponseJson(ApiResponse::success(opportunities)))
}

/// POST /api/businesses/{business_id}/opportunities
/// Create an opportunity at the end of its kanban column
pub async fn create_opportunity(
    State(deployment): State<DeploymentImpl>,
    ApiPath(business_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<CreateOpportunity>,
) -> Result<ResponseJson<ApiResponse<Opportunity>>, ApiError> {
    require_title(&payload.title)?;
    require_business(&deployment, business_id).await?;

    let opportunity =
        Opportunity::create(&deployment.db().pool, business_id, &payload, Uuid::new_v4()).await?;
    info!(
        business_id = %business_id,
        opportunity_id = %opportunity.id,
        timeline = %opportunity.timeline,
        "Created opportunity"
    );
    Ok(ResponseJson(ApiResponse::success(opportunity)))
}

/// GET /api/businesses/{business_id}/opportunities/board
/// Kanban columns and per-category timeline grids, derived from one query
pub async fn get_board(
    State(deployment): State<DeploymentImpl>,
    ApiPath(business_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<OpportunityBoard>>, ApiError> {
    let planner = OpportunityPlanner::new(deployment.db().pool.clone());
    let board = planner.board(business_id).await?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

/// POST /api/businesses/{business_id}/opportunities/reorder
/// Rewrite the order of one kanban column
pub async fn reorder_column(
    State(deployment): State<DeploymentImpl>,
    ApiPath(business_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ReorderColumn>,
) -> Result<ResponseJson<ApiResponse<OpportunityBoard>>, ApiError> {
    require_business(&deployment, business_id).await?;
    let planner = OpportunityPlanner::new(deployment.db().pool.clone());
    let board = planner
        .reorder_column(business_id, payload.timeline, &payload.opportunity_ids)
        .await?;
    Ok(ResponseJson(ApiResponse::success(board)))
}

/// GET /api/opportunities/{opportunity_id}
pub async fn get_opportunity(
    State(deployment): State<DeploymentImpl>,
    ApiPath(opportunity_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Opportunity>>, ApiError> {
    let opportunity = Opportunity::find_by_id(&deployment.db().pool, opportunity_id)
        .await?
        .ok_or(ApiError::NotFound("opportunity"))?;
    Ok(ResponseJson(ApiResponse::success(opportunity)))
}

/// PUT /api/opportunities/{opportunity_id}
/// Manual edit of the free-form fields
pub async fn update_opportunity(
    State(deployment): State<DeploymentImpl>,
    ApiPath(opportunity_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateOpportunity>,
) -> Result<ResponseJson<ApiResponse<Opportunity>>, ApiError> {
    if let Some(title) = &payload.title {
        require_title(title)?;
    }
    let opportunity = Opportunity::update(&deployment.db().pool, opportunity_id, &payload)
        .await?
        .ok_or(ApiError::NotFound("opportunity"))?;
    Ok(ResponseJson(ApiResponse::success(opportunity)))
}

/// DELETE /api/opportunities/{opportunity_id}
pub async fn delete_opportunity(
    State(deployment): State<DeploymentImpl>,
    ApiPath(opportunity_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows = Opportunity::delete(&deployment.db().pool, opportunity_id).await?;
    if rows == 0 {
        return Err(ApiError::NotFound("opportunity"));
    }
    info!(opportunity_id = %opportunity_id, "Deleted opportunity");
    Ok(ResponseJson(ApiResponse::success(())))
}

/// POST /api/opportunities/{opportunity_id}/planner
/// Apply a move or resize, typically the commit of a finished drag gesture
pub async fn apply_planner_command(
    State(deployment): State<DeploymentImpl>,
    ApiPath(opportunity_id): ApiPath<Uuid>,
    ApiJson(command): ApiJson<PlannerCommand>,
) -> Result<ResponseJson<ApiResponse<Opportunity>>, ApiError> {
    let planner = OpportunityPlanner::new(deployment.db().pool.clone());
    let opportunity = planner.apply(opportunity_id, command).await?;
    Ok(ResponseJson(ApiResponse::success(opportunity)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    let business_opportunities = Router::new()
        .route("/", get(get_opportunities).post(create_opportunity))
        .route("/board", get(get_board))
        .route("/reorder", post(reorder_column));

    let opportunity = Router::new()
        .route(
            "/",
            get(get_opportunity)
                .put(update_opportunity)
                .delete(delete_opportunity),
        )
        .route("/planner", post(apply_planner_command));

    Router::new()
        .nest("/businesses/{business_id}/opportunities", business_opportunities)
        .nest("/opportunities/{opportunity_id}", opportunity)
}
