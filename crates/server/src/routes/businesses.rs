use axum::{
    Router,
    extract::State,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::business::{Business, BusinessDeletion, CreateBusiness, UpdateBusiness};
use tracing::info;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{
    DeploymentImpl,
    error::ApiError,
    extract::{ApiJson, ApiPath},
};

fn require_name(name: &str) -> Result<(), ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::BadRequest("Business name is required".to_string()));
    }
    Ok(())
}

/// GET /api/businesses
/// List businesses by name
pub async fn get_businesses(
    State(deployment): State<DeploymentImpl>,
) -> Result<ResponseJson<ApiResponse<Vec<Business>>>, ApiError> {
    let businesses = Business::find_all(&deployment.db().pool).await?;
    Ok(ResponseJson(ApiResponse::success(businesses)))
}

/// POST /api/businesses
/// Create a business
pub async fn create_business(
    State(deployment): State<DeploymentImpl>,
    ApiJson(payload): ApiJson<CreateBusiness>,
) -> Result<ResponseJson<ApiResponse<Business>>, ApiError> {
    require_name(&payload.name)?;
    let business = Business::create(&deployment.db().pool, &payload, Uuid::new_v4()).await?;
    info!(business_id = %business.id, name = %business.name, "Created business");
    Ok(ResponseJson(ApiResponse::success(business)))
}

/// GET /api/businesses/{business_id}
pub async fn get_business(
    State(deployment): State<DeploymentImpl>,
    ApiPath(business_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<Business>>, ApiError> {
    let business = Business::find_by_id(&deployment.db().pool, business_id)
        .await?
        .ok_or(ApiError::NotFound("business"))?;
    Ok(ResponseJson(ApiResponse::success(business)))
}

/// PUT /api/businesses/{business_id}
/// Update name, website or industry
pub async fn update_business(
    State(deployment): State<DeploymentImpl>,
    ApiPath(business_id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<UpdateBusiness>,
) -> Result<ResponseJson<ApiResponse<Business>>, ApiError> {
    if let Some(name) = &payload.name {
        require_name(name)?;
    }
    let business = Business::update(&deployment.db().pool, business_id, &payload)
        .await?
        .ok_or(ApiError::NotFound("business"))?;
    Ok(ResponseJson(ApiResponse::success(business)))
}

/// DELETE /api/businesses/{business_id}
/// Delete the business together with its opportunities and scorecards
pub async fn delete_business(
    State(deployment): State<DeploymentImpl>,
    ApiPath(business_id): ApiPath<Uuid>,
) -> Result<ResponseJson<ApiResponse<BusinessDeletion>>, ApiError> {
    let deletion = Business::delete_cascade(&deployment.db().pool, business_id).await?;
    if deletion.businesses == 0 {
        return Err(ApiError::NotFound("business"));
    }
    info!(
        business_id = %business_id,
        opportunities = deletion.opportunities,
        scorecards = deletion.scorecards,
        "Deleted business"
    );
    Ok(ResponseJson(ApiResponse::success(deletion)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().nest(
        "/businesses",
        Router::new()
            .route("/", get(get_businesses).post(create_business))
            .route(
                "/{business_id}",
                get(get_business).put(update_business).delete(delete_business),
            ),
    )
}
