/**
 * Reviews Routes
 * Patient testimonials: public listing, manual entry and batch import
 */
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{
    models::{NewReview, Review},
    parse_timestamp,
    reviews::{self, ReviewSummary},
};
use crate::error::AppError;
use crate::routes::admin::require_admin;
use crate::AppState;

const MIN_RATING: i64 = 1;
const MAX_RATING: i64 = 5;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    pub reviews: Vec<Review>,
    pub summary: ReviewSummary,
}

/// A review as submitted by the admin UI or an import batch.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewInput {
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default)]
    pub external_id: Option<String>,
    pub author_name: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
    /// RFC 3339 or `YYYY-MM-DD`.
    #[serde(default)]
    pub date_created: Option<String>,
}

fn default_source() -> String {
    "manual".to_string()
}

/// Candidates stay untyped until each is checked on its own, so one bad
/// entry is counted as rejected instead of failing the whole batch.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub reviews: Vec<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImportResponse {
    pub success: bool,
    pub imported: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub message: String,
}

impl ReviewInput {
    fn into_new_review(self) -> Result<NewReview, AppError> {
        let author_name = self.author_name.trim().to_string();
        if author_name.is_empty() {
            return Err(AppError::validation("Author name is required"));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(AppError::validation(format!(
                "Rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        let source = match self.source.trim() {
            "" => default_source(),
            s => s.to_lowercase(),
        };
        let date_created = match self.date_created.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                parse_timestamp(raw)
                    .map_err(|_| AppError::validation(format!("Invalid date_created: {}", raw)))?,
            ),
        };

        Ok(NewReview {
            source,
            external_id: self.external_id.filter(|id| !id.trim().is_empty()),
            author_name,
            rating: self.rating,
            comment: self
                .comment
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            date_created,
        })
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/reviews - active reviews, newest first, plus a summary
pub async fn list_reviews(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let reviews = reviews::list_active(&state.pool).await?;
    let summary = reviews::summary(&state.pool).await?;
    Ok(Json(ReviewListResponse { reviews, summary }))
}

/// POST /api/reviews - manual entry (requires auth)
pub async fn create_review(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ReviewInput>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    let Json(payload) = payload?;

    let review = reviews::create(&state.pool, &payload.into_new_review()?).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// POST /api/reviews/import - insert the candidates not already stored
pub async fn import_reviews(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    let Json(payload) = payload?;

    let mut candidates = Vec::with_capacity(payload.reviews.len());
    let mut rejected = 0;
    for raw in payload.reviews {
        let checked = serde_json::from_value::<ReviewInput>(raw)
            .map_err(|e| AppError::validation(e.to_string()))
            .and_then(ReviewInput::into_new_review);
        match checked {
            Ok(review) => candidates.push(review),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping invalid review candidate");
                rejected += 1;
            }
        }
    }

    let outcome = reviews::import_batch(&state.pool, &candidates).await?;

    Ok(Json(ImportResponse {
        success: true,
        imported: outcome.imported,
        skipped: outcome.skipped,
        rejected,
        message: format!(
            "{} reviews imported, {} already present, {} rejected",
            outcome.imported, outcome.skipped, rejected
        ),
    }))
}
