/**
 * Page Routes
 * Client shell for public pages and the admin page guard
 */
use axum::{
    extract::{OriginalUri, State},
    http::HeaderMap,
    response::{Html, IntoResponse, Redirect, Response},
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::AppError;
use crate::extractors::admin_claims;
use crate::state::AppState;

/// Public page paths answered with the client shell.
pub const PUBLIC_PAGES: &[&str] = &[
    "/",
    "/about",
    "/contact",
    "/resources",
    "/privacy",
    "/terms",
    "/disclaimer",
    "/blog",
    "/blog/category/{category_name}",
    "/blog/{slug}",
    "/login",
];

/// Admin page paths guarded by [`admin_page`].
pub const ADMIN_PAGES: &[&str] = &[
    "/admin/dashboard",
    "/admin/posts",
    "/admin/posts/new",
    "/admin/posts/edit/{id}",
    "/admin/categories",
    "/admin/subscribers",
    "/admin/contacts",
];

/// RFC 3986 unreserved characters stay readable; everything else is escaped.
const RETURN_TO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// `/login?returnTo=<percent-encoded path and query>`
pub fn login_redirect_target(path_and_query: &str) -> String {
    format!(
        "/login?returnTo={}",
        utf8_percent_encode(path_and_query, RETURN_TO)
    )
}

async fn shell(state: &AppState) -> Response {
    let index = state.config().static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to read client shell {}: {}", index.display(), e);
            AppError::not_found("Page").into_response()
        }
    }
}

/// GET on any public page
pub async fn public_page(State(state): State<AppState>) -> Response {
    shell(&state).await
}

/// GET on any admin page: the shell for admins, otherwise 303 to the login page.
pub async fn admin_page(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    if let Err(e) = admin_claims(&state.config().jwt_secret, &headers) {
        let path_and_query = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        tracing::debug!(path = %path_and_query, reason = %e, "admin page redirected to login");
        return Redirect::to(&login_redirect_target(path_and_query)).into_response();
    }
    shell(&state).await
}

/// GET /admin
pub async fn admin_root() -> Redirect {
    Redirect::to("/admin/dashboard")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::testing::{admin_bearer, empty_request, send, test_state, token_with_role};
    use axum::http::{header::LOCATION, Method, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use std::sync::Arc;

    fn pages_router(state: AppState) -> Router {
        let mut router = Router::new().route("/admin", get(admin_root));
        for path in PUBLIC_PAGES {
            router = router.route(path, get(public_page));
        }
        for path in ADMIN_PAGES {
            router = router.route(path, get(admin_page));
        }
        router.with_state(state)
    }

    fn state_with_shell(dir: &tempfile::TempDir) -> AppState {
        std::fs::write(dir.path().join("index.html"), "<div id=\"root\"></div>").unwrap();
        let base = test_state();
        let config = AppConfig {
            static_dir: dir.path().to_path_buf(),
            ..base.config().clone()
        };
        AppState::new(Arc::new(crate::store::MemoryStore::seeded(None)), config)
    }

    #[test]
    fn test_return_to_is_percent_encoded() {
        assert_eq!(
            login_redirect_target("/admin/posts?page=2"),
            "/login?returnTo=%2Fadmin%2Fposts%3Fpage%3D2"
        );
    }

    #[tokio::test]
    async fn test_anonymous_admin_visit_redirects_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let app = pages_router(state_with_shell(&dir));
        let (status, headers, _) = send(
            app,
            empty_request(Method::GET, "/admin/posts/edit/42?tab=seo", None),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(
            headers.get(LOCATION).unwrap(),
            "/login?returnTo=%2Fadmin%2Fposts%2Fedit%2F42%3Ftab%3Dseo"
        );
    }

    #[tokio::test]
    async fn test_non_admin_session_redirects_too() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_shell(&dir);
        let auth = format!("Bearer {}", token_with_role(&state, "viewer"));
        let (status, _, _) = send(
            pages_router(state),
            empty_request(Method::GET, "/admin/dashboard", Some(&auth)),
        )
        .await;
        assert_eq!(status, StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_admin_gets_shell() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with_shell(&dir);
        let auth = admin_bearer(&state);
        let (status, _, body) = send(
            pages_router(state),
            empty_request(Method::GET, "/admin/contacts", Some(&auth)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8_lossy(&body).contains("root"));
    }

    #[tokio::test]
    async fn test_public_pages_and_admin_root() {
        let dir = tempfile::tempdir().unwrap();
        let app = pages_router(state_with_shell(&dir));
        let (status, _, _) = send(
            app.clone(),
            empty_request(Method::GET, "/blog/category/investing", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, headers, _) = send(app, empty_request(Method::GET, "/admin", None)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(headers.get(LOCATION).unwrap(), "/admin/dashboard");
    }
}
