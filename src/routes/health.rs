/**
 * Health Routes
 * Endpoints for checking backend health status
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::db::{self, Backend};
use crate::AppState;

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Detailed health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: ServiceCheck,
}

/// Ready check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

fn backend_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Sqlite => "sqlite",
        Backend::Postgres => "postgres",
    }
}

async fn check_database(state: &AppState) -> ServiceCheck {
    match db::health_check(&state.pool).await {
        Ok(duration) => ServiceCheck {
            status: "healthy".to_string(),
            backend: Some(backend_name(state.backend).to_string()),
            response_time: Some(duration.as_millis() as u64),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            ServiceCheck {
                status: "unhealthy".to_string(),
                backend: Some(backend_name(state.backend).to_string()),
                response_time: None,
                error: Some("database unreachable".to_string()),
            }
        }
    }
}

/// GET /health - Simple health ping
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/detailed - Detailed health with all checks
pub async fn health_detailed(State(state): State<AppState>) -> impl IntoResponse {
    let database = check_database(&state).await;
    let status = if database.status == "healthy" { "ok" } else { "degraded" };

    Json(DetailedHealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime: Some(SERVER_START.elapsed().as_secs()),
        checks: HealthChecks { database },
    })
}

/// GET /health/database - Database health check
pub async fn health_database(State(state): State<AppState>) -> impl IntoResponse {
    let check = check_database(&state).await;
    let status = if check.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(check))
}

/// GET /health/ready - Readiness check; not ready without a database
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();
    let ready = db::health_check(&state.pool).await.is_ok();

    let response = ReadyResponse {
        status: if ready { "ready" } else { "not ready" }.to_string(),
        timestamp: Utc::now(),
        uptime: Some(uptime),
        reason: (!ready).then(|| "Database is not reachable".to_string()),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
