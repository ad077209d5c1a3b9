//! Practice Site Backend - library for app logic and testing

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod routes;
pub mod text;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::AnyPool;
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
};

use crate::config::{AppConfig, AuthConfig};
use crate::db::Backend;
use crate::error::StartupError;

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: AnyPool,
    pub backend: Backend,
    pub auth: AuthConfig,
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN, falling back
/// to the local dev servers.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                HeaderValue::from_static("http://localhost:5173"),
                HeaderValue::from_static("http://127.0.0.1:5173"),
                HeaderValue::from_static("http://localhost:3000"),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();

    Router::new()
        .route(
            "/api/content",
            get(routes::content::list_sections),
        )
        .route(
            "/api/content/{section_id}",
            get(routes::content::get_section)
                .put(routes::content::put_section)
                .options(routes::preflight),
        )
        .route("/api/settings", get(routes::settings::list_settings))
        .route(
            "/api/settings/{key}",
            get(routes::settings::get_setting)
                .put(routes::settings::put_setting)
                .options(routes::preflight),
        )
        .route(
            "/api/whatsapp-url",
            post(routes::settings::whatsapp_url).options(routes::preflight),
        )
        .route(
            "/api/blog/posts",
            get(routes::blog::list_posts)
                .post(routes::blog::create_post)
                .options(routes::preflight),
        )
        .route("/api/blog/posts/featured", get(routes::blog::featured_posts))
        // slug for public reads, numeric id for admin writes
        .route(
            "/api/blog/posts/{key}",
            get(routes::blog::get_post)
                .put(routes::blog::update_post)
                .delete(routes::blog::delete_post)
                .options(routes::preflight),
        )
        .route(
            "/api/blog/posts/{key}/publish",
            post(routes::blog::publish_post).options(routes::preflight),
        )
        .route(
            "/api/blog/categories",
            get(routes::blog::list_categories)
                .post(routes::blog::create_category)
                .options(routes::preflight),
        )
        .route(
            "/api/admin/blog/posts",
            get(routes::blog::admin_list_posts),
        )
        .route(
            "/api/admin/blog/posts/{key}",
            get(routes::blog::admin_get_post),
        )
        .route(
            "/api/reviews",
            get(routes::reviews::list_reviews)
                .post(routes::reviews::create_review)
                .options(routes::preflight),
        )
        .route(
            "/api/reviews/import",
            post(routes::reviews::import_reviews).options(routes::preflight),
        )
        .route(
            "/api/admin/login",
            post(routes::admin::login).options(routes::preflight),
        )
        .route("/api/admin/check-auth", get(routes::admin::check_auth))
        .route(
            "/api/admin/logout",
            post(routes::admin::logout).options(routes::preflight),
        )
        .route(
            "/api/admin/profile",
            get(routes::admin::profile)
                .put(routes::admin::update_profile)
                .options(routes::preflight),
        )
        .route(
            "/api/admin/change-password",
            post(routes::admin::change_password).options(routes::preflight),
        )
        .route(
            "/api/admin/dashboard/stats",
            get(routes::admin::dashboard_stats),
        )
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        // Global 2 MB request body cap
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024))
        .layer(cors)
        .layer(middleware::from_fn(routes::preflight_no_content))
}

/// Open the store, bring the schema up to date and seed missing defaults.
pub async fn init_state(config: &AppConfig) -> Result<AppState, StartupError> {
    let backend = config.db.backend().ok_or_else(|| {
        StartupError::InvalidConfig(format!(
            "DATABASE_URL must start with sqlite: or postgres:, got {}",
            config.db.url.split(':').next().unwrap_or_default()
        ))
    })?;

    let pool = db::init_pool(&config.db).await?;
    db::run_migrations(&pool, backend).await?;
    db::blog::reindex_search_text(&pool).await?;
    db::seed::seed_defaults(&pool, &config.admin, config.auth.bcrypt_cost).await?;

    Ok(AppState {
        pool,
        backend,
        auth: config.auth.clone(),
    })
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();

    // Held for the whole run; dropping them loses buffered log lines.
    let _log_guards = logging::init(&logging::LogConfig::from_env(config.is_production()));

    config.validate()?;
    routes::health::init_start_time();

    let state = init_state(&config).await?;
    let app = create_app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("invalid HOST/PORT: {}", e)))?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
