/**
 * Dashboard Route
 * Summary counts for the admin landing page
 */
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::blog::PostFilter;
use crate::db::models::ContactSubmission;
use crate::error::ApiResult;
use crate::extractors::AdminSession;
use crate::pagination::Pagination;
use crate::state::AppState;

const RECENT_CONTACTS: i64 = 5;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_posts: i64,
    pub featured_posts: i64,
    pub categories: i64,
    pub subscribers: i64,
    pub contacts: i64,
    pub recent_contacts: Vec<ContactSubmission>,
}

/// GET /api/admin/dashboard
pub async fn dashboard(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> ApiResult<Json<DashboardStats>> {
    let store = state.store();
    let one = Pagination::new(1, 1);

    let (_, total_posts) = store.list_posts(&PostFilter::default(), Some(one)).await?;
    let featured = PostFilter {
        featured: Some(true),
        ..Default::default()
    };
    let (_, featured_posts) = store.list_posts(&featured, Some(one)).await?;
    let categories = store.list_categories().await?.len() as i64;
    let (_, subscribers) = store.list_subscriptions(None, one).await?;
    let (recent_contacts, contacts) = store
        .list_contacts(None, Pagination::new(1, RECENT_CONTACTS))
        .await?;

    Ok(Json(DashboardStats {
        total_posts,
        featured_posts,
        categories,
        subscribers,
        contacts,
        recent_contacts,
    }))
}
