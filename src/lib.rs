//! Finance90 Backend - library for app logic and testing

pub mod blog;
pub mod challenge;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod logging;
pub mod pagination;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::{net::SocketAddr, path::Path, sync::Arc};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::store::{ContentStore, MemoryStore, PostgresStore};

/// Global request body cap; uploads need up to 5 MB of it.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// Configure CORS from the allowed origin list.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let config = state.config();
    let cors = configure_cors(config);
    tracing::info!("CORS configured for {} origin(s)", config.allowed_origins.len());

    let mut pages = Router::new().route("/admin", get(routes::pages::admin_root));
    for path in routes::pages::PUBLIC_PAGES {
        pages = pages.route(path, get(routes::pages::public_page));
    }
    for path in routes::pages::ADMIN_PAGES {
        pages = pages.route(path, get(routes::pages::admin_page));
    }

    let api = Router::new()
        .route("/api/logs", post(routes::logs::receive_client_logs))
        // auth
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/verify", post(routes::auth::verify_token))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/auth/logout", post(routes::auth::logout))
        // public blog
        .route("/api/blog", get(routes::blog::list_posts))
        .route("/api/blog/featured", get(routes::blog::featured_posts))
        .route("/api/blog/category/{slug}", get(routes::blog::category_posts))
        .route("/api/blog/{slug}", get(routes::blog::get_post))
        .route("/api/blog/{slug}/related", get(routes::blog::related_posts))
        .route("/api/categories", get(routes::categories::list_categories))
        .route("/api/categories/{slug}", get(routes::categories::get_category))
        // leads
        .route("/api/contact/challenge", get(routes::contact::get_challenge))
        .route("/api/contact", post(routes::contact::submit_contact))
        .route("/api/newsletter", post(routes::newsletter::subscribe))
        // admin
        .route("/api/admin/dashboard", get(routes::dashboard::dashboard))
        .route(
            "/api/admin/posts",
            get(routes::blog::admin_list_posts).post(routes::blog::create_post),
        )
        .route(
            "/api/admin/posts/{id}",
            get(routes::blog::admin_get_post)
                .patch(routes::blog::update_post)
                .delete(routes::blog::delete_post),
        )
        .route(
            "/api/admin/categories",
            post(routes::categories::create_category),
        )
        .route(
            "/api/admin/categories/{id}",
            axum::routing::patch(routes::categories::update_category)
                .delete(routes::categories::delete_category),
        )
        .route("/api/admin/contacts", get(routes::contact::list_contacts))
        .route(
            "/api/admin/contacts/{id}",
            delete(routes::contact::delete_contact),
        )
        .route(
            "/api/admin/subscribers",
            get(routes::newsletter::list_subscribers),
        )
        .route(
            "/api/admin/subscribers/{id}",
            delete(routes::newsletter::delete_subscriber),
        )
        .route(
            "/api/admin/uploads",
            get(routes::upload::list_images).post(routes::upload::upload_image),
        )
        .route(
            "/api/admin/uploads/{filename}",
            delete(routes::upload::delete_image),
        )
        // feed + health
        .route("/rss.xml", get(routes::rss::rss_feed))
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready));

    api.merge(pages)
        .nest_service(
            routes::upload::PUBLIC_PREFIX,
            ServeDir::new(&config.upload_dir),
        )
        .fallback_service(ServeDir::new(&config.static_dir))
        .with_state(state.clone())
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
}

/// Postgres when `DATABASE_URL` is set and reachable, otherwise the in-memory store.
async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ContentStore>> {
    if std::env::var("DATABASE_URL").is_err() {
        tracing::info!("DATABASE_URL not set. Running on the in-memory store.");
        return Ok(Arc::new(memory_store(config)));
    }

    match db::init_pool(None).await {
        Ok(pool) => {
            db::run_migrations(&pool)
                .await
                .context("failed to run database migrations")?;
            if let Some(hash) = &config.admin_password_hash {
                db::seed_admin(&pool, &config.admin_email, hash)
                    .await
                    .context("failed to seed admin user")?;
            }
            Ok(Arc::new(PostgresStore::new(pool)))
        }
        Err(e) => {
            tracing::warn!(
                "Failed to initialize database pool: {}. Continuing on the in-memory store.",
                e
            );
            Ok(Arc::new(memory_store(config)))
        }
    }
}

fn memory_store(config: &AppConfig) -> MemoryStore {
    let admin = config
        .admin_password_hash
        .as_deref()
        .map(|hash| (config.admin_email.as_str(), hash));
    MemoryStore::seeded(admin)
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Run the server (used by main).
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment =
        std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    let _log_guards = logging::init(&environment, Path::new("logs"));

    let config = AppConfig::from_env().context("invalid configuration")?;
    let store = build_store(&config).await?;
    tracing::info!("Using {} store", store.backend());

    let addr: SocketAddr = config
        .addr()
        .parse()
        .with_context(|| format!("invalid HOST/PORT configuration: {}", config.addr()))?;

    let app = create_app(AppState::new(store, config));

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}
