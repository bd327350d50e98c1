/**
 * Blog Routes
 * Public post listings and the admin post CRUD API
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::blog::category::CategoryScope;
use crate::blog::{queries, BlogPost, NewPost, PostFilter, PostPatch};
use crate::error::{ApiResult, AppError};
use crate::extractors::AdminSession;
use crate::pagination::{ListQuery, Page, Pagination, ADMIN_PAGE_SIZE, POSTS_PAGE_SIZE};
use crate::routes::SuccessResponse;
use crate::state::AppState;

/// Posts shown in featured and related strips when no `limit` is given.
const DEFAULT_STRIP_SIZE: i64 = 3;
const MAX_STRIP_SIZE: i64 = 12;

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for GET /api/blog
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogListQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub search: Option<String>,
    /// Category slug; `all` or absent means every category.
    pub category: Option<String>,
    pub featured: Option<bool>,
}

impl BlogListQuery {
    fn pagination(&self) -> Pagination {
        Pagination::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(POSTS_PAGE_SIZE),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StripQuery {
    pub limit: Option<i64>,
}

impl StripQuery {
    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_STRIP_SIZE)
            .clamp(1, MAX_STRIP_SIZE)
    }
}

fn category_not_found() -> AppError {
    AppError::not_found("Category")
}

// ============================================================================
// Public Handlers
// ============================================================================

/// GET /api/blog - paginated posts, newest first
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<BlogListQuery>,
) -> ApiResult<Json<Page<BlogPost>>> {
    let pagination = query.pagination();
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let mut filter = match query.category.as_deref() {
        Some(slug) => {
            match queries::resolve_category(state.store(), slug).await? {
                CategoryScope::All => PostFilter::default(),
                CategoryScope::Title(title) => PostFilter {
                    category: Some(title),
                    ..Default::default()
                },
                CategoryScope::Unknown => return Err(category_not_found()),
            }
        }
        None => PostFilter::default(),
    };
    filter.featured = query.featured;
    filter.search = search;

    Ok(Json(queries::fetch_posts(state.store(), &filter, pagination).await?))
}

/// GET /api/blog/featured
pub async fn featured_posts(
    State(state): State<AppState>,
    Query(query): Query<StripQuery>,
) -> ApiResult<Json<Vec<BlogPost>>> {
    Ok(Json(
        queries::fetch_featured_posts(state.store(), query.limit()).await?,
    ))
}

/// GET /api/blog/category/{slug} - unknown slugs answer 404
pub async fn category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<BlogPost>>> {
    queries::fetch_category_page(state.store(), &slug, query.pagination(POSTS_PAGE_SIZE))
        .await?
        .map(Json)
        .ok_or_else(category_not_found)
}

/// GET /api/blog/{slug}
pub async fn get_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<BlogPost>> {
    queries::fetch_post_by_slug(state.store(), &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Post"))
}

/// GET /api/blog/{slug}/related
pub async fn related_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<StripQuery>,
) -> ApiResult<Json<Vec<BlogPost>>> {
    let post = queries::fetch_post_by_slug(state.store(), &slug)
        .await?
        .ok_or_else(|| AppError::not_found("Post"))?;
    let related =
        queries::fetch_related_posts(state.store(), &post, query.limit() as usize).await?;
    Ok(Json(related))
}

// ============================================================================
// Admin Handlers
// ============================================================================

/// GET /api/admin/posts
pub async fn admin_list_posts(
    _admin: AdminSession,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Page<BlogPost>>> {
    let filter = PostFilter {
        search: query.search_term(),
        ..Default::default()
    };
    let page =
        queries::fetch_posts(state.store(), &filter, query.pagination(ADMIN_PAGE_SIZE)).await?;
    Ok(Json(page))
}

/// GET /api/admin/posts/{id}
pub async fn admin_get_post(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BlogPost>> {
    queries::fetch_post_by_id(state.store(), id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Post"))
}

/// POST /api/admin/posts
pub async fn create_post(
    admin: AdminSession,
    State(state): State<AppState>,
    Json(payload): Json<NewPost>,
) -> ApiResult<(StatusCode, Json<BlogPost>)> {
    let post = queries::create_post(state.store(), payload).await?;
    tracing::info!(by = %admin.claims.email, slug = %post.slug, "post published");
    Ok((StatusCode::CREATED, Json(post)))
}

/// PATCH /api/admin/posts/{id} - only the supplied fields change
pub async fn update_post(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<PostPatch>,
) -> ApiResult<Json<BlogPost>> {
    Ok(Json(queries::update_post(state.store(), id, patch).await?))
}

/// DELETE /api/admin/posts/{id}
pub async fn delete_post(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SuccessResponse>> {
    queries::delete_post(state.store(), id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::ErrorResponse;
    use crate::testing::{
        admin_bearer, empty_request, json_request, send, send_json, test_state, token_with_role,
    };
    use axum::http::Method;
    use axum::routing::get;
    use axum::Router;

    fn blog_router(state: AppState) -> Router {
        Router::new()
            .route("/api/blog", get(list_posts))
            .route("/api/blog/featured", get(featured_posts))
            .route("/api/blog/category/{slug}", get(category_posts))
            .route("/api/blog/{slug}", get(get_post))
            .route("/api/blog/{slug}/related", get(related_posts))
            .route(
                "/api/admin/posts",
                get(admin_list_posts).post(create_post),
            )
            .route(
                "/api/admin/posts/{id}",
                get(admin_get_post).patch(update_post).delete(delete_post),
            )
            .with_state(state)
    }

    fn new_post(title: &str, category: &str) -> NewPost {
        NewPost {
            title: title.to_string(),
            category: category.to_string(),
            excerpt: Some("Excerpt".to_string()),
            content: Some("<p>Content</p>".to_string()),
            ..Default::default()
        }
    }

    async fn publish(app: &Router, auth: &str, post: &NewPost) -> (StatusCode, axum::body::Bytes) {
        let req = json_request(Method::POST, "/api/admin/posts", Some(auth), post);
        let (status, _, bytes) = send(app.clone(), req).await;
        (status, bytes)
    }

    #[tokio::test]
    async fn test_create_requires_session() {
        let app = blog_router(test_state());
        let req = json_request(
            Method::POST,
            "/api/admin/posts",
            None,
            &new_post("Hello", "Investing"),
        );
        let (status, _, _) = send(app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_rejects_non_admin_role() {
        let state = test_state();
        let auth = format!("Bearer {}", token_with_role(&state, "viewer"));
        let app = blog_router(state);
        let (status, _) = publish(&app, &auth, &new_post("Hello", "Investing")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_publish_then_read_by_slug() {
        let state = test_state();
        let auth = admin_bearer(&state);
        let app = blog_router(state);

        let (status, bytes) = publish(&app, &auth, &new_post("Roth vs Traditional", "Retirement Planning")).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: BlogPost = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(created.slug, "roth-vs-traditional");
        assert_eq!(created.author, crate::blog::DEFAULT_AUTHOR);

        let (status, fetched): (_, BlogPost) = send_json(
            app,
            empty_request(Method::GET, "/api/blog/roth-vs-traditional", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn test_post_titled_featured_stays_reachable() {
        let state = test_state();
        let auth = admin_bearer(&state);
        let app = blog_router(state);

        let (status, bytes) = publish(&app, &auth, &new_post("Featured", "Investing")).await;
        assert_eq!(status, StatusCode::CREATED);
        let created: BlogPost = serde_json::from_slice(&bytes).unwrap();
        assert_ne!(created.slug, "featured");

        let uri = format!("/api/blog/{}", created.slug);
        let (status, fetched): (_, BlogPost) =
            send_json(app, empty_request(Method::GET, &uri, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn test_duplicate_explicit_slug_conflicts() {
        let state = test_state();
        let auth = admin_bearer(&state);
        let app = blog_router(state);

        let mut post = new_post("One", "Taxes");
        post.slug = Some("same-slug".into());
        assert_eq!(publish(&app, &auth, &post).await.0, StatusCode::CREATED);

        let (status, bytes) = publish(&app, &auth, &post).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(body.error.contains("slug already exists"));
    }

    #[tokio::test]
    async fn test_unknown_category_endpoint_is_404() {
        let app = blog_router(test_state());
        let (status, _, _) = send(
            app,
            empty_request(Method::GET, "/api/blog/category/crypto-moonshots", None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_category_listing_filters_by_title() {
        let state = test_state();
        let auth = admin_bearer(&state);
        let app = blog_router(state);
        publish(&app, &auth, &new_post("A", "Taxes")).await;
        publish(&app, &auth, &new_post("B", "Budgeting")).await;

        let (status, page): (_, Page<BlogPost>) = send_json(
            app.clone(),
            empty_request(Method::GET, "/api/blog/category/taxes", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].category, "Taxes");

        let (_, all): (_, Page<BlogPost>) =
            send_json(app, empty_request(Method::GET, "/api/blog/category/all", None)).await;
        assert_eq!(all.total, 2);
    }

    #[tokio::test]
    async fn test_patch_only_changes_supplied_fields() {
        let state = test_state();
        let auth = admin_bearer(&state);
        let app = blog_router(state);
        let (_, bytes) = publish(&app, &auth, &new_post("Emergency Fund", "Budgeting")).await;
        let created: BlogPost = serde_json::from_slice(&bytes).unwrap();

        let req = json_request(
            Method::PATCH,
            &format!("/api/admin/posts/{}", created.id),
            Some(&auth),
            &serde_json::json!({ "featured": true, "metaTitle": "Build an emergency fund" }),
        );
        let (status, updated): (_, BlogPost) = send_json(app.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(updated.featured);
        assert_eq!(updated.meta_title, "Build an emergency fund");
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.excerpt, created.excerpt);

        let (_, featured): (_, Vec<BlogPost>) =
            send_json(app, empty_request(Method::GET, "/api/blog/featured", None)).await;
        assert_eq!(featured.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_404() {
        let state = test_state();
        let auth = admin_bearer(&state);
        let app = blog_router(state);
        let (_, bytes) = publish(&app, &auth, &new_post("Short Lived", "Taxes")).await;
        let created: BlogPost = serde_json::from_slice(&bytes).unwrap();

        let uri = format!("/api/admin/posts/{}", created.id);
        let (status, _, _) = send(app.clone(), empty_request(Method::DELETE, &uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = send(app, empty_request(Method::GET, &uri, Some(&auth))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_paginates_with_total_pages() {
        let state = test_state();
        let auth = admin_bearer(&state);
        let app = blog_router(state);
        for i in 0..5 {
            publish(&app, &auth, &new_post(&format!("Post {i}"), "Investing")).await;
        }
        let (_, page): (_, Page<BlogPost>) = send_json(
            app,
            empty_request(Method::GET, "/api/blog?page=2&pageSize=2", None),
        )
        .await;
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].slug, "post-2");
    }
}
