/**
 * Content Routes
 * Editable page sections (hero, about, services, contact, ...)
 */
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::db::content;
use crate::error::AppError;
use crate::routes::admin::require_admin;
use crate::AppState;

const MAX_SECTION_ID_LEN: usize = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// One entry of GET /api/content, keyed by section id
#[derive(Debug, Serialize, Deserialize)]
pub struct SectionEntry {
    pub section_name: String,
    pub content_data: Value,
    pub updated_at: DateTime<Utc>,
}

/// Request body for PUT /api/content/{section_id}
#[derive(Debug, Deserialize)]
pub struct UpdateSectionRequest {
    #[serde(alias = "data")]
    pub content_data: Value,
    #[serde(default)]
    pub section_name: Option<String>,
}

// ============================================================================
// Validation
// ============================================================================

fn validate_section_id(section_id: &str) -> Result<(), AppError> {
    let valid = !section_id.is_empty()
        && section_id.len() <= MAX_SECTION_ID_LEN
        && section_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(AppError::validation(
            "Section id may only contain letters, digits, '-' and '_'",
        ))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/content
pub async fn list_sections(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let sections = content::list_sections(&state.pool).await?;

    let by_id: BTreeMap<String, SectionEntry> = sections
        .into_iter()
        .map(|s| {
            (
                s.section_id,
                SectionEntry {
                    section_name: s.section_name,
                    content_data: s.content_data,
                    updated_at: s.updated_at,
                },
            )
        })
        .collect();

    Ok(Json(by_id))
}

/// GET /api/content/{section_id}
pub async fn get_section(
    State(state): State<AppState>,
    Path(section_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(content::get_section(&state.pool, &section_id).await?))
}

/// PUT /api/content/{section_id} - create or replace (requires auth)
pub async fn put_section(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(section_id): Path<String>,
    payload: Result<Json<UpdateSectionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    validate_section_id(&section_id)?;
    let Json(payload) = payload?;

    let section_name = payload
        .section_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let section = content::put_section(&state.pool, &section_id, section_name, &payload.content_data).await?;
    tracing::info!(section_id = %section.section_id, "Content section updated");

    Ok(Json(section))
}
