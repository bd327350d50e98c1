use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;

use crate::error::AppError;
use crate::session::{verify_access_token, Claims};
use crate::state::AppState;

/// Cookie carrying the access token for browser sessions.
pub const SESSION_COOKIE: &str = "f90_session";

/// Bearer token first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    bearer.or_else(|| {
        CookieJar::from_headers(headers)
            .get(SESSION_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Claims of a valid admin session, or the rejection to send.
pub fn admin_claims(secret: &str, headers: &HeaderMap) -> Result<Claims, AppError> {
    let token = session_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let claims = verify_access_token(secret, &token).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;

    if !claims.is_admin() {
        tracing::warn!(user = %claims.email, role = %claims.role, "non-admin session refused");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }
    Ok(claims)
}

/// Authenticated admin. Rejects with 401 without a valid session, 403 for other roles.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub claims: Claims,
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = admin_claims(&state.config().jwt_secret, &parts.headers)?;
        Ok(AdminSession { claims })
    }
}
