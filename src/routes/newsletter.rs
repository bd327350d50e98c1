/**
 * Newsletter Routes
 * Public subscription endpoint and the admin subscriber list
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::models::NewsletterSubscription;
use crate::error::{ApiResult, AppError};
use crate::extractors::AdminSession;
use crate::pagination::{ListQuery, Page, ADMIN_PAGE_SIZE};
use crate::routes::contact::is_valid_email;
use crate::routes::SuccessResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Serialize)]
pub struct SubscribeRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SubscribeResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/newsletter
/// A repeated email answers 409 "You're already subscribed to our newsletter."
pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<SubscribeRequest>,
) -> ApiResult<(StatusCode, Json<SubscribeResponse>)> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::bad_request("Please enter a valid email address"));
    }

    let subscription = state.store().insert_subscription(&email).await?;
    tracing::info!(subscription_id = %subscription.id, "newsletter subscription added");

    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            success: true,
            message: "Thanks for subscribing!".to_string(),
        }),
    ))
}

/// GET /api/admin/subscribers?search=&page=&pageSize=
pub async fn list_subscribers(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<NewsletterSubscription>>> {
    let pagination = query.pagination(ADMIN_PAGE_SIZE);
    let search = query.search_term();
    let (items, total) = state
        .store()
        .list_subscriptions(search.as_deref(), pagination)
        .await?;
    Ok(Json(Page::new(items, pagination, total)))
}

/// DELETE /api/admin/subscribers/{id}
pub async fn delete_subscriber(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    if !state.store().delete_subscription(id).await? {
        return Err(AppError::not_found("Subscriber"));
    }
    Ok(Json(SuccessResponse::ok()))
}
