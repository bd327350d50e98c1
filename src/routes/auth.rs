/**
 * Authentication Routes
 * JWT-based admin authentication with login, verify, refresh, and logout
 */
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use bcrypt::verify;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::extractors::{session_token, SESSION_COOKIE};
use crate::session::{create_access_token, verify_access_token};
use crate::state::AppState;

/// Where a successful login lands when no usable `returnTo` was given.
pub const DEFAULT_REDIRECT: &str = "/admin/dashboard";

// ============================================================================
// Types
// ============================================================================

/// User info returned to frontend
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub return_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub user: Option<UserInfo>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub is_valid: bool,
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Keep `returnTo` only when it is a same-site absolute path.
pub fn sanitize_return_to(return_to: Option<&str>) -> String {
    match return_to.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.starts_with("/login") =>
        {
            path.to_string()
        }
        _ => DEFAULT_REDIRECT.to_string(),
    }
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config().secure_cookies)
        .build()
}

fn login_failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(LoginResponse {
            error: Some(message.to_string()),
            ..Default::default()
        }),
    )
        .into_response()
}

fn refresh_failure(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(RefreshResponse {
            error: Some(message.to_string()),
            ..Default::default()
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
/// Authenticate an admin, set the session cookie and return tokens
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let ip = addr.ip().to_string();

    if !state.login_throttle().allow(&ip).await {
        tracing::warn!(ip = %ip, "login throttled");
        return login_failure(
            StatusCode::TOO_MANY_REQUESTS,
            "Too many requests. Please try again later.",
        );
    }

    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return login_failure(StatusCode::BAD_REQUEST, "Email and password are required");
    }
    if !email.contains('@') {
        return login_failure(StatusCode::BAD_REQUEST, "Invalid email format");
    }

    let admin = match state.store().find_admin(email).await {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            tracing::warn!("Login attempt for unknown user: {}", email);
            return login_failure(StatusCode::UNAUTHORIZED, "Invalid credentials");
        }
        Err(e) => {
            tracing::error!("Store error during login: {}", e);
            return login_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service temporarily unavailable.",
            );
        }
    };

    if !admin.is_active {
        return login_failure(StatusCode::FORBIDDEN, "Account is disabled.");
    }

    // bcrypt is CPU-bound; keep the async executor free.
    let password = payload.password.clone();
    let password_hash = admin.password_hash.clone();
    let password_ok = tokio::task::spawn_blocking(move || {
        verify(&password, &password_hash).unwrap_or(false)
    })
    .await
    .unwrap_or(false);
    if !password_ok {
        tracing::warn!("Failed login attempt for: {}", admin.email);
        return login_failure(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    if let Err(e) = state.store().record_login(&admin.id, &ip).await {
        tracing::warn!("Failed to record login metadata: {}", e);
    }

    let access_token = match create_access_token(
        &state.config().jwt_secret,
        &admin.id,
        &admin.email,
        &admin.role,
    ) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to create access token: {}", e);
            return login_failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token");
        }
    };
    let refresh_token = state
        .sessions()
        .issue(&admin.id, &admin.email, &admin.role)
        .await;

    tracing::info!("Successful login for user: {}", admin.email);

    let jar = jar.add(session_cookie(&state, access_token.clone()));
    (
        jar,
        Json(LoginResponse {
            success: true,
            user: Some(UserInfo {
                user_id: admin.id,
                email: admin.email,
                role: admin.role,
            }),
            access_token: Some(access_token),
            refresh_token: Some(refresh_token),
            redirect_to: Some(sanitize_return_to(payload.return_to.as_deref())),
            error: None,
        }),
    )
        .into_response()
}

/// POST /api/auth/verify
/// Verify the bearer token or session cookie and return user info
pub async fn verify_token(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    let Some(token) = session_token(&headers) else {
        return Json(VerifyResponse {
            success: false,
            is_valid: false,
            user: None,
            error: Some("No authorization token provided".to_string()),
        });
    };

    match verify_access_token(&state.config().jwt_secret, &token) {
        Ok(claims) => Json(VerifyResponse {
            success: true,
            is_valid: true,
            user: Some(UserInfo {
                user_id: claims.sub,
                email: claims.email,
                role: claims.role,
            }),
            error: None,
        }),
        Err(e) => {
            tracing::debug!("Token verification failed: {}", e);
            Json(VerifyResponse {
                success: false,
                is_valid: false,
                user: None,
                error: Some("Invalid or expired token".to_string()),
            })
        }
    }
}

/// POST /api/auth/refresh
/// Exchange a refresh token for a new access token; the refresh token is rotated
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<RefreshRequest>,
) -> Response {
    if payload.refresh_token.is_empty() {
        return refresh_failure(StatusCode::BAD_REQUEST, "Refresh token is required");
    }

    let Some((owner, new_refresh_token)) = state.sessions().rotate(&payload.refresh_token).await
    else {
        return refresh_failure(StatusCode::UNAUTHORIZED, "Invalid or expired refresh token");
    };

    let access_token = match create_access_token(
        &state.config().jwt_secret,
        &owner.user_id,
        &owner.email,
        &owner.role,
    ) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("Failed to create access token: {}", e);
            return refresh_failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create token");
        }
    };

    let jar = jar.add(session_cookie(&state, access_token.clone()));
    (
        jar,
        Json(RefreshResponse {
            success: true,
            access_token: Some(access_token),
            refresh_token: Some(new_refresh_token),
            error: None,
        }),
    )
        .into_response()
}

/// POST /api/auth/logout
/// Revoke the given refresh token, or every token of the caller, and clear the cookie.
/// The body is optional.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let payload: LogoutRequest = serde_json::from_slice(&body).unwrap_or_default();

    if let Some(refresh_token) = payload.refresh_token {
        state.sessions().revoke(&refresh_token).await;
    }

    if let Some(access_token) = payload.access_token.or_else(|| session_token(&headers)) {
        if let Ok(claims) = verify_access_token(&state.config().jwt_secret, &access_token) {
            state.sessions().revoke_user(&claims.sub).await;
            tracing::info!("User logged out: {}", claims.email);
        }
    }

    // Logout is idempotent
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(LogoutResponse { success: true }))
}
