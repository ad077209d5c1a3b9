/**
 * Admin Routes
 * Login, session check, logout, profile and dashboard for the single admin
 */
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::AuthConfig;
use crate::db::{
    admins, blog,
    models::{Admin, AdminProfile},
};
use crate::error::AppError;
use crate::routes::blog::PostSummary;
use crate::routes::SuccessResponse;
use crate::AppState;

const MIN_PASSWORD_LEN: usize = 6;

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Admin id
    pub sid: String, // Session id; its hash is stored on the admin row
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    /// Username or email.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub admin: AdminProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckAuthResponse {
    pub authenticated: bool,
    pub admin: AdminProfile,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileResponse {
    pub success: bool,
    pub message: String,
    pub admin: AdminProfile,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub total_views: i64,
    pub popular_posts: Vec<PostSummary>,
    pub recent_posts: Vec<PostSummary>,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn generate_session_id() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 48)
}

/// SHA-256 hex of a session id, the form stored in `admins.session_token`.
fn hash_session_id(session_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(session_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn create_access_token(
    auth: &AuthConfig,
    admin_id: i64,
    session_id: &str,
) -> Result<(String, DateTime<Utc>), AppError> {
    let now = Utc::now();
    let expires_at = now + Duration::minutes(auth.token_ttl_minutes);

    let claims = Claims {
        sub: admin_id.to_string(),
        sid: session_id.to_string(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(auth.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token signing failed: {}", e)))?;

    Ok((token, expires_at))
}

/// Verify signature and expiry of an access token.
pub fn verify_access_token(auth: &AuthConfig, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve the request's bearer token to an active admin whose current
/// session it belongs to.
pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Admin, AppError> {
    let token = extract_bearer_token(headers).ok_or_else(|| AppError::unauthorized("Authorization required"))?;

    let invalid = || AppError::unauthorized("Invalid or expired token");

    let claims = verify_access_token(&state.auth, token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        invalid()
    })?;
    let admin_id: i64 = claims.sub.parse().map_err(|_| invalid())?;

    let admin = admins::find_by_id(&state.pool, admin_id).await?.ok_or_else(invalid)?;

    if !admin.is_active {
        return Err(invalid());
    }
    if admin.session_token.as_deref() != Some(hash_session_id(&claims.sid).as_str()) {
        return Err(invalid());
    }

    Ok(admin)
}

/// bcrypt is CPU-bound; keep it off the async workers.
async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check panicked: {}", e)))?
        .or_else(|e| {
            tracing::warn!(error = %e, "Stored password hash is unreadable");
            Ok(false)
        })
}

async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing panicked: {}", e)))?
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/admin/login
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;

    if payload.username.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::validation("Username and password are required"));
    }

    let invalid = || AppError::unauthorized("Invalid credentials");

    let admin = match admins::find_by_login(&state.pool, &payload.username).await? {
        Some(admin) => admin,
        None => {
            tracing::warn!(login = %payload.username, "Login attempt for unknown admin");
            return Err(invalid());
        }
    };

    if !verify_password(payload.password, admin.password_hash.clone()).await? {
        tracing::warn!(admin_id = admin.id, "Login attempt with wrong password");
        return Err(invalid());
    }
    if !admin.is_active {
        tracing::warn!(admin_id = admin.id, "Login attempt on inactive admin");
        return Err(invalid());
    }

    let session_id = generate_session_id();
    let (token, expires_at) = create_access_token(&state.auth, admin.id, &session_id)?;
    admins::start_session(&state.pool, admin.id, &hash_session_id(&session_id)).await?;

    let admin = admins::find_by_id(&state.pool, admin.id).await?.ok_or_else(invalid)?;
    tracing::info!(admin_id = admin.id, "Admin logged in");

    Ok(Json(LoginResponse {
        success: true,
        token,
        expires_at,
        admin: AdminProfile::from(&admin),
    }))
}

/// GET /api/admin/check-auth
pub async fn check_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let admin = require_admin(&state, &headers).await?;
    Ok(Json(CheckAuthResponse {
        authenticated: true,
        admin: AdminProfile::from(&admin),
    }))
}

/// POST /api/admin/logout
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let admin = require_admin(&state, &headers).await?;
    admins::clear_session(&state.pool, admin.id).await?;
    tracing::info!(admin_id = admin.id, "Admin logged out");
    Ok(Json(SuccessResponse::with_message("Logged out")))
}

/// GET /api/admin/profile
pub async fn profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let admin = require_admin(&state, &headers).await?;
    Ok(Json(AdminProfile::from(&admin)))
}

/// PUT /api/admin/profile - change full name and/or email
pub async fn update_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let Json(payload) = payload?;

    let full_name = payload.full_name.map(|n| n.trim().to_string());
    if full_name.as_deref() == Some("") {
        return Err(AppError::validation("Full name cannot be empty"));
    }
    let email = payload.email.map(|e| e.trim().to_string());
    if let Some(email) = email.as_deref() {
        if !is_plausible_email(email) {
            return Err(AppError::validation("Email address is not valid"));
        }
    }

    let updated =
        admins::update_profile(&state.pool, admin.id, full_name.as_deref(), email.as_deref()).await?;

    Ok(Json(UpdateProfileResponse {
        success: true,
        message: "Profile updated".to_string(),
        admin: AdminProfile::from(&updated),
    }))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !email.contains(' ')
        }
        None => false,
    }
}

/// POST /api/admin/change-password
pub async fn change_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let admin = require_admin(&state, &headers).await?;
    let Json(payload) = payload?;

    if payload.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "New password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    if !verify_password(payload.current_password, admin.password_hash.clone()).await? {
        return Err(AppError::validation("Current password is incorrect"));
    }

    let hash = hash_password(payload.new_password, state.auth.bcrypt_cost).await?;
    admins::update_password(&state.pool, admin.id, &hash).await?;
    tracing::info!(admin_id = admin.id, "Admin password changed");

    Ok(Json(SuccessResponse::with_message("Password changed")))
}

/// GET /api/admin/dashboard/stats
pub async fn dashboard_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&state, &headers).await?;
    let stats = blog::dashboard_stats(&state.pool).await?;

    Ok(Json(DashboardResponse {
        total_posts: stats.total_posts,
        published_posts: stats.published_posts,
        draft_posts: stats.draft_posts,
        total_views: stats.total_views,
        popular_posts: stats.popular_posts.into_iter().map(PostSummary::from).collect(),
        recent_posts: stats.recent_posts.into_iter().map(PostSummary::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{login, send, test_app};
    use axum::http::StatusCode;
    use serde_json::json;

    async fn stored_session(state: &AppState) -> Option<String> {
        admins::find_by_login(&state.pool, "admin")
            .await
            .unwrap()
            .unwrap()
            .session_token
    }

    #[test]
    fn test_token_round_trip() {
        let auth = AuthConfig {
            jwt_secret: "secret".to_string(),
            token_ttl_minutes: 5,
            bcrypt_cost: 4,
        };
        let (token, _) = create_access_token(&auth, 7, "sid").unwrap();
        let claims = verify_access_token(&auth, &token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.sid, "sid");

        let other = AuthConfig {
            jwt_secret: "other".to_string(),
            ..auth
        };
        assert!(verify_access_token(&other, &token).is_err());
    }

    #[test]
    fn test_session_hash_is_hex_sha256() {
        let hash = hash_session_id("abc");
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, "abc");
        assert_eq!(hash, hash_session_id("abc"));
    }

    #[tokio::test]
    async fn test_login_success_returns_token() {
        let (app, state) = test_app().await;
        let token = login(&app).await;
        assert!(!token.is_empty());
        assert!(stored_session(&state).await.is_some());

        let (status, body) = send(&app, "GET", "/api/admin/check-auth", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["admin"]["username"], "admin");
        assert!(body["admin"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_login_by_email_ignores_case() {
        let (app, _) = test_app().await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "ADMIN@example.com", "password": "admin123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_password_is_401_and_keeps_session() {
        let (app, state) = test_app().await;
        let token = login(&app).await;
        let before = stored_session(&state).await;

        let (status, body) = send(
            &app,
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");
        assert_eq!(stored_session(&state).await, before);

        let (status, _) = send(&app, "GET", "/api/admin/check-auth", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_user_is_401() {
        let (app, _) = test_app().await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "ghost", "password": "admin123"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_login_missing_fields_is_400() {
        let (app, _) = test_app().await;
        let (status, _) = send(
            &app,
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "", "password": ""})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, "POST", "/api/admin/login", None, Some(json!({"user": "x"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_check_auth_requires_valid_token() {
        let (app, _) = test_app().await;
        let (status, body) = send(&app, "GET", "/api/admin/check-auth", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authorization required");

        let (status, _) = send(&app, "GET", "/api/admin/check-auth", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_relogin_invalidates_previous_token() {
        let (app, _) = test_app().await;
        let first = login(&app).await;
        let second = login(&app).await;

        let (status, _) = send(&app, "GET", "/api/admin/profile", Some(&first), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, "GET", "/api/admin/profile", Some(&second), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let (app, state) = test_app().await;
        let token = login(&app).await;

        let (status, body) = send(&app, "POST", "/api/admin/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(stored_session(&state).await.is_none());

        let (status, _) = send(&app, "GET", "/api/admin/check-auth", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_change_password() {
        let (app, _) = test_app().await;
        let token = login(&app).await;

        let (status, _) = send(
            &app,
            "POST",
            "/api/admin/change-password",
            Some(&token),
            Some(json!({"current_password": "admin123", "new_password": "123"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            "/api/admin/change-password",
            Some(&token),
            Some(json!({"current_password": "nope", "new_password": "novasenha"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            "/api/admin/change-password",
            Some(&token),
            Some(json!({"current_password": "admin123", "new_password": "novasenha"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            "POST",
            "/api/admin/login",
            None,
            Some(json!({"username": "admin", "password": "novasenha"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (app, _) = test_app().await;
        let token = login(&app).await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/admin/profile",
            Some(&token),
            Some(json!({"full_name": "Dr. Rodrigo", "email": "contato@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["admin"]["full_name"], "Dr. Rodrigo");
        assert_eq!(body["admin"]["email"], "contato@example.com");

        let (_, profile) = send(&app, "GET", "/api/admin/profile", Some(&token), None).await;
        assert_eq!(profile["full_name"], "Dr. Rodrigo");
        assert_eq!(profile["email"], "contato@example.com");

        let (status, _) = send(
            &app,
            "PUT",
            "/api/admin/profile",
            Some(&token),
            Some(json!({"email": "not-an-email"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, "PUT", "/api/admin/profile", None, Some(json!({"full_name": "x"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_profile_email_taken_is_409() {
        let (app, state) = test_app().await;
        admins::create(&state.pool, "secretaria", "secretaria@example.com", "Secretaria", "h")
            .await
            .unwrap();
        let token = login(&app).await;

        let (status, body) = send(
            &app,
            "PUT",
            "/api/admin/profile",
            Some(&token),
            Some(json!({"email": "Secretaria@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Email already in use");

        let (_, profile) = send(&app, "GET", "/api/admin/profile", Some(&token), None).await;
        assert_ne!(profile["email"], "Secretaria@example.com");
    }

    #[test]
    fn test_is_plausible_email() {
        assert!(is_plausible_email("dr@clinica.com.br"));
        assert!(!is_plausible_email("dr@clinica"));
        assert!(!is_plausible_email("@clinica.com"));
        assert!(!is_plausible_email("dr clinica@x.com"));
    }

    #[tokio::test]
    async fn test_dashboard_stats_requires_admin() {
        let (app, _) = test_app().await;
        let (status, _) = send(&app, "GET", "/api/admin/dashboard/stats", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = login(&app).await;
        let (status, body) = send(&app, "GET", "/api/admin/dashboard/stats", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_posts"], 0);
        assert!(body["recent_posts"].as_array().unwrap().is_empty());
    }
}
