//! Application configuration loaded from environment variables.

use std::{env, path::PathBuf};

use bcrypt::{hash, DEFAULT_COST};

/// Secret used when `JWT_SECRET` is unset. Refused in production.
pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

/// Development fallback password for the seeded admin.
const DEV_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("PORT must be a valid u16, got {0:?}")]
    InvalidPort(String),

    #[error("JWT_SECRET must be set to a secure, unique value in production")]
    InsecureJwtSecret,

    #[error("failed to hash ADMIN_PASSWORD: {0}")]
    AdminPassword(#[from] bcrypt::BcryptError),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// `production` switches on JSON logs and strict secret checks.
    pub environment: String,
    pub jwt_secret: String,
    /// Email of the admin seeded into an empty admin table.
    pub admin_email: String,
    /// bcrypt hash for the seeded admin. `None` disables seeding.
    pub admin_password_hash: Option<String>,
    pub allowed_origins: Vec<String>,
    /// Where uploaded post images are written.
    pub upload_dir: PathBuf,
    /// Directory holding the client bundle (`index.html` + assets).
    pub static_dir: PathBuf,
    pub site_url: String,
    pub site_title: String,
    pub site_description: String,
    /// Marks the session cookie `Secure`.
    pub secure_cookies: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
            environment: "development".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            admin_email: "admin@example.com".to_string(),
            admin_password_hash: None,
            allowed_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
            upload_dir: PathBuf::from("uploads/blog"),
            static_dir: PathBuf::from("public"),
            site_url: "https://finance90.com".to_string(),
            site_title: "Finance90 Blog".to_string(),
            site_description: "Practical guides on budgeting, investing and personal finance"
                .to_string(),
            secure_cookies: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            Err(_) => defaults.port,
        };

        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let is_production = environment == "production";

        let jwt_secret = env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret);
        if is_production && (jwt_secret.is_empty() || jwt_secret == DEFAULT_JWT_SECRET) {
            return Err(ConfigError::InsecureJwtSecret);
        }

        let admin_email = env::var("ADMIN_EMAIL").unwrap_or(defaults.admin_email);
        let admin_password_hash = if let Ok(hashed) = env::var("ADMIN_HASH_PASSWORD") {
            Some(hashed)
        } else if let Ok(plain) = env::var("ADMIN_PASSWORD") {
            Some(hash(plain, DEFAULT_COST)?)
        } else if is_production {
            tracing::warn!(
                "SECURITY: neither ADMIN_HASH_PASSWORD nor ADMIN_PASSWORD is set; \
                 no admin account will be seeded"
            );
            None
        } else {
            tracing::warn!("ADMIN_PASSWORD not set, seeding admin with the development password");
            Some(hash(DEV_ADMIN_PASSWORD, DEFAULT_COST)?)
        };

        if is_production && admin_email == "admin@example.com" {
            tracing::warn!("SECURITY: ADMIN_EMAIL is using an insecure default");
        }

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port,
            environment,
            jwt_secret,
            admin_email,
            admin_password_hash,
            allowed_origins: allowed_origins().unwrap_or(defaults.allowed_origins),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.static_dir),
            site_url: env::var("SITE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.site_url),
            site_title: env::var("SITE_TITLE").unwrap_or(defaults.site_title),
            site_description: env::var("SITE_DESCRIPTION").unwrap_or(defaults.site_description),
            secure_cookies: env::var("SECURE_COOKIES")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(is_production),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `ALLOWED_ORIGINS` (comma-separated) wins over `FRONTEND_ORIGIN`.
fn allowed_origins() -> Option<Vec<String>> {
    env::var("ALLOWED_ORIGINS")
        .ok()
        .map(|s| {
            s.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty())
        .or_else(|| env::var("FRONTEND_ORIGIN").ok().map(|origin| vec![origin]))
}
