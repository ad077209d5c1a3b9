/**
 * Settings Routes
 * Site-wide key/value settings (site info, social links, theme)
 */
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::db::content;
use crate::error::AppError;
use crate::routes::admin::require_admin;
use crate::AppState;

/// Setting that holds `whatsapp.phone` and `whatsapp.messages`.
const CONTACT_SETTING: &str = "social_media";
const FALLBACK_WHATSAPP_MESSAGE: &str = "Olá! Gostaria de agendar uma consulta.";

/// Request body for PUT /api/settings/{key}
#[derive(Debug, Deserialize)]
pub struct UpdateSettingRequest {
    #[serde(alias = "value")]
    pub setting_value: Value,
}

#[derive(Debug, Deserialize)]
pub struct WhatsAppUrlRequest {
    #[serde(default = "default_service_type")]
    pub service_type: String,
}

fn default_service_type() -> String {
    "general".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WhatsAppUrlResponse {
    pub url: String,
    pub phone: String,
    pub message: String,
}

/// Build a wa.me link from the stored contact setting. The message for
/// `service_type` wins, then the `general` one, then a plain greeting.
fn whatsapp_link(contact: &Value, service_type: &str) -> Result<WhatsAppUrlResponse, AppError> {
    let whatsapp = &contact["whatsapp"];
    let phone: String = whatsapp["phone"]
        .as_str()
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if phone.is_empty() {
        return Err(AppError::not_found("WhatsApp number"));
    }

    let messages = &whatsapp["messages"];
    let message = [service_type, "general"]
        .iter()
        .find_map(|key| messages[*key].as_str().map(str::trim).filter(|m| !m.is_empty()))
        .unwrap_or(FALLBACK_WHATSAPP_MESSAGE)
        .to_string();

    let url = Url::parse_with_params(&format!("https://wa.me/{}", phone), &[("text", &message)])
        .map_err(|e| AppError::Internal(format!("invalid WhatsApp link: {}", e)))?;

    Ok(WhatsAppUrlResponse {
        url: url.to_string(),
        phone,
        message,
    })
}

/// GET /api/settings - all settings as `{key: value}`
pub async fn list_settings(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let settings = content::list_settings(&state.pool).await?;
    let map: Map<String, Value> = settings
        .into_iter()
        .map(|s| (s.setting_key, s.setting_value))
        .collect();
    Ok(Json(Value::Object(map)))
}

/// GET /api/settings/{key}
pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(content::get_setting(&state.pool, &key).await?))
}

/// PUT /api/settings/{key} - create or replace (requires auth)
pub async fn put_setting(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
    payload: Result<Json<UpdateSettingRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    if key.trim().is_empty() {
        return Err(AppError::validation("Setting key is required"));
    }
    let Json(payload) = payload?;

    let setting = content::put_setting(&state.pool, &key, &payload.setting_value).await?;
    tracing::info!(setting_key = %key, "Setting updated");

    Ok(Json(setting))
}

/// POST /api/whatsapp-url - chat link for a service, e.g. `{"service_type": "echo"}`
pub async fn whatsapp_url(
    State(state): State<AppState>,
    payload: Result<Json<WhatsAppUrlRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let contact = content::get_setting(&state.pool, CONTACT_SETTING).await?;
    Ok(Json(whatsapp_link(&contact.setting_value, payload.service_type.trim())?))
}
