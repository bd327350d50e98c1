/**
 * Session Module
 * Access-token JWTs, the refresh-token registry and the login throttle
 */
use std::collections::HashMap;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// Access token expiry in minutes
pub const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// Refresh token expiry in days
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

/// Login attempts allowed per IP inside one window
pub const LOGIN_ATTEMPTS_PER_WINDOW: u32 = 5;

/// Rate limit window in seconds
pub const LOGIN_WINDOW_SECS: i64 = 60;

/// Role required by every admin surface.
pub const ADMIN_ROLE: &str = "admin";

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,   // User ID
    pub email: String, // User email
    pub role: String,  // User role
    pub exp: i64,      // Expiry timestamp
    pub iat: i64,      // Issued at timestamp
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Create access token
pub fn create_access_token(
    secret: &str,
    user_id: &str,
    email: &str,
    role: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Verify and decode access token
pub fn verify_access_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Generate a random refresh token
pub fn generate_refresh_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 64)
}

/// SHA-256 hex digest; only digests of refresh tokens are kept.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stored refresh token data
#[derive(Debug, Clone)]
pub struct RefreshTokenData {
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub expires_at: i64,
    pub revoked: bool,
}

impl RefreshTokenData {
    fn is_live(&self, now: i64) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// In-memory refresh tokens keyed by their SHA-256 digest.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    tokens: RwLock<HashMap<String, RefreshTokenData>>,
}

impl SessionRegistry {
    /// Issue a fresh refresh token for the user and return the plain value.
    pub async fn issue(&self, user_id: &str, email: &str, role: &str) -> String {
        let token = generate_refresh_token();
        let expires_at = Utc::now() + Duration::days(REFRESH_TOKEN_EXPIRY_DAYS);

        let mut tokens = self.tokens.write().await;
        let now = Utc::now().timestamp();
        tokens.retain(|_, data| data.is_live(now));
        tokens.insert(
            hash_refresh_token(&token),
            RefreshTokenData {
                user_id: user_id.to_string(),
                email: email.to_string(),
                role: role.to_string(),
                expires_at: expires_at.timestamp(),
                revoked: false,
            },
        );
        token
    }

    /// Revoke `token` and hand back its owner with a replacement token.
    /// `None` when the token is unknown, revoked or expired.
    pub async fn rotate(&self, token: &str) -> Option<(RefreshTokenData, String)> {
        let digest = hash_refresh_token(token);
        let now = Utc::now().timestamp();

        let data = {
            let mut tokens = self.tokens.write().await;
            let entry = tokens.get_mut(&digest)?;
            if !entry.is_live(now) {
                return None;
            }
            entry.revoked = true;
            entry.clone()
        };

        let replacement = self.issue(&data.user_id, &data.email, &data.role).await;
        Some((data, replacement))
    }

    pub async fn revoke(&self, token: &str) {
        let digest = hash_refresh_token(token);
        if let Some(data) = self.tokens.write().await.get_mut(&digest) {
            data.revoked = true;
        }
    }

    pub async fn revoke_user(&self, user_id: &str) {
        let mut tokens = self.tokens.write().await;
        for data in tokens.values_mut() {
            if data.user_id == user_id {
                data.revoked = true;
            }
        }
    }
}

/// Fixed-window attempt counter per client IP.
#[derive(Debug)]
pub struct LoginThrottle {
    max_attempts: u32,
    window_secs: i64,
    windows: RwLock<HashMap<String, (i64, u32)>>,
}

impl Default for LoginThrottle {
    fn default() -> Self {
        Self::new(LOGIN_ATTEMPTS_PER_WINDOW, LOGIN_WINDOW_SECS)
    }
}

impl LoginThrottle {
    pub fn new(max_attempts: u32, window_secs: i64) -> Self {
        Self {
            max_attempts,
            window_secs,
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Count an attempt from `ip`; `false` once the window's budget is spent.
    pub async fn allow(&self, ip: &str) -> bool {
        self.allow_at(ip, Utc::now().timestamp()).await
    }

    async fn allow_at(&self, ip: &str, now: i64) -> bool {
        let mut windows = self.windows.write().await;

        // Evict expired windows so the map tracks active IPs only.
        windows.retain(|_, (start, _)| now - *start < self.window_secs);

        let (_, count) = windows.entry(ip.to_string()).or_insert((now, 0));
        if *count >= self.max_attempts {
            return false;
        }
        *count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_access_token_round_trip() {
        let token = create_access_token(SECRET, "id-1", "a@b.com", ADMIN_ROLE).unwrap();
        let claims = verify_access_token(SECRET, &token).unwrap();
        assert_eq!(claims.sub, "id-1");
        assert!(claims.is_admin());
        assert!(verify_access_token("other-secret", &token).is_err());
    }

    #[test]
    fn test_verify_access_token_invalid_returns_err() {
        assert!(verify_access_token(SECRET, "invalid.jwt.token").is_err());
    }

    #[tokio::test]
    async fn test_rotation_revokes_old_token() {
        let registry = SessionRegistry::default();
        let first = registry.issue("id-1", "a@b.com", ADMIN_ROLE).await;

        let (owner, second) = registry.rotate(&first).await.unwrap();
        assert_eq!(owner.user_id, "id-1");
        assert_ne!(first, second);
        assert!(registry.rotate(&first).await.is_none());
        assert!(registry.rotate(&second).await.is_some());
    }

    #[tokio::test]
    async fn test_revoke_user_kills_all_tokens() {
        let registry = SessionRegistry::default();
        let a = registry.issue("id-1", "a@b.com", ADMIN_ROLE).await;
        let b = registry.issue("id-1", "a@b.com", ADMIN_ROLE).await;
        registry.revoke_user("id-1").await;
        assert!(registry.rotate(&a).await.is_none());
        assert!(registry.rotate(&b).await.is_none());
    }

    #[tokio::test]
    async fn test_throttle_allows_five_per_window() {
        let throttle = LoginThrottle::default();
        for _ in 0..LOGIN_ATTEMPTS_PER_WINDOW {
            assert!(throttle.allow_at("1.2.3.4", 1_000).await);
        }
        assert!(!throttle.allow_at("1.2.3.4", 1_010).await);
        assert!(throttle.allow_at("5.6.7.8", 1_010).await);
        assert!(throttle.allow_at("1.2.3.4", 1_000 + LOGIN_WINDOW_SECS).await);
    }
}
