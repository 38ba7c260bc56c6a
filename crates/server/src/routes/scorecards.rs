use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::opportunity::Category;
use services::services::scorecard::{
    CategoryBatch, NewHighlight, NewMetricSignal, ScorecardDocument, ScorecardService,
};
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, ApiPath},
};

fn scorecards(deployment: &DeploymentImpl) -> ScorecardService {
    ScorecardService::new(deployment.db().pool.clone())
}

/// GET /api/businesses/{business_id}/scorecards
/// All four category documents
pub async fn get_scorecards(
    State(deployment): State<DeploymentImpl>,
    ApiPath(business_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<ScorecardDocument>>>, ApiError> {
    let documents = scorecards(&deployment).list_documents(business_id).await?;
    Ok(ResponseJson(ApiResponse::success(documents)))
}

/// GET /api/businesses/{business_id}/scorecards/{category}
/// Read one document, migrated to the current shape
pub async fn get_scorecard(
    State(deployment): State<DeploymentImpl>,
    ApiPath((business_id, category)): ApiPath<(Uuid, Category)>,
) -> Result<ResponseJson<ApiResponse<ScorecardDocument>>, ApiError> {
    let document = scorecards(&deployment)
        .get_document(business_id, category)
        .await?;
    Ok(ResponseJson(ApiResponse::success(document)))
}

/// POST /api/businesses/{business_id}/scorecards/{category}/highlights
/// Add a human highlight
pub async fn add_highlight(
    State(deployment): State<DeploymentImpl>,
    ApiPath((business_id, category)): ApiPath<(Uuid, Category)>,
    ApiJson(payload): ApiJson<NewHighlight>,
) -> Result<ResponseJson<ApiResponse<ScorecardDocument>>, ApiError> {
    let document = scorecards(&deployment)
        .add_highlight(business_id, category, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(document)))
}

/// DELETE /api/businesses/{business_id}/scorecards/{category}/highlights/{highlight_id}
pub async fn remove_highlight(
    State(deployment): State<DeploymentImpl>,
    ApiPath((business_id, category, highlight_id)): ApiPath<(Uuid, Category, String)>,
) -> Result<ResponseJson<ApiResponse<ScorecardDocument>>, ApiError> {
    let document = scorecards(&deployment)
        .remove_highlight(business_id, category, &highlight_id)
        .await?;
    Ok(ResponseJson(ApiResponse::success(document)))
}

/// POST /api/businesses/{business_id}/scorecards/{category}/signals
/// Add a human metric signal
pub async fn add_metric_signal(
    State(deployment): State<DeploymentImpl>,
    ApiPath((business_id, category)): ApiPath<(Uuid, Category)>,
    ApiJson(payload): ApiJson<NewMetricSignal>,
) -> Result<ResponseJson<ApiResponse<ScorecardDocument>>, ApiError> {
    let document = scorecards(&deployment)
        .add_metric_signal(business_id, category, payload)
        .await?;
    Ok(ResponseJson(ApiResponse::success(document)))
}

/// POST /api/businesses/{business_id}/scorecards/ai-batch
/// Merge AI audit results, one bucket at a time. On failure, buckets merged
/// before the failing one stay saved.
pub async fn apply_ai_batch(
    State(deployment): State<DeploymentImpl>,
    ApiPath(business_id): ApiPath<Uuid>,
    ApiJson(batches): ApiJson<Vec<CategoryBatch>>,
) -> Result<ResponseJson<ApiResponse<Vec<ScorecardDocument>>>, ApiError> {
    let documents = scorecards(&deployment)
        .apply_ai_batches(business_id, batches)
        .await?;
    Ok(ResponseJson(ApiResponse::success(documents)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/businesses/{business_id}/scorecards",
        Router::new()
            .route("/", get(get_scorecards))
            .route("/ai-batch", post(apply_ai_batch))
            .route("/{category}", get(get_scorecard))
            .route("/{category}/highlights", post(add_highlight))
            .route("/{category}/highlights/{highlight_id}", delete(remove_highlight))
            .route("/{category}/signals", post(add_metric_signal)),
    )
}
