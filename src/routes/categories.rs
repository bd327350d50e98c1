/**
 * Category Routes
 * Public category lookup and admin category management
 */
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::blog::{queries, BlogCategory, CategoryPatch, NewCategory};
use crate::error::{ApiResult, AppError};
use crate::extractors::AdminSession;
use crate::routes::SuccessResponse;
use crate::state::AppState;

/// GET /api/categories
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Vec<BlogCategory>>> {
    Ok(Json(queries::fetch_categories(state.store()).await?))
}

/// GET /api/categories/{slug}
pub async fn get_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<BlogCategory>> {
    queries::fetch_category_by_slug(state.store(), &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Category"))
}

/// POST /api/admin/categories
pub async fn create_category(
    _admin: AdminSession,
    State(state): State<AppState>,
    Json(payload): Json<NewCategory>,
) -> ApiResult<(StatusCode, Json<BlogCategory>)> {
    let category = queries::create_category(state.store(), payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// PATCH /api/admin/categories/{id}
pub async fn update_category(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CategoryPatch>,
) -> ApiResult<Json<BlogCategory>> {
    Ok(Json(queries::update_category(state.store(), id, patch).await?))
}

/// DELETE /api/admin/categories/{id}
pub async fn delete_category(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    queries::delete_category(state.store(), id).await?;
    Ok(Json(SuccessResponse::ok()))
}
