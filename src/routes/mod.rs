pub mod admin;
pub mod blog;
pub mod content;
pub mod health;
pub mod reviews;
pub mod settings;

use axum::{
    body::Body,
    extract::Request,
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Success response (for delete, logout, ...)
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuccessResponse {
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }
}

/// OPTIONS on a mutating route: empty 204.
pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// The CORS layer answers pre-flights itself with 200; clients of this API
/// expect every OPTIONS to be an empty 204.
pub async fn preflight_no_content(request: Request, next: Next) -> Response {
    let is_options = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;

    if is_options && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
        *response.body_mut() = Body::empty();
    }

    response
}

/// Numeric ids arrive as path text; anything else names no row.
pub(crate) fn parse_id(raw: &str, entity: &str) -> Result<i64, AppError> {
    raw.parse::<i64>().map_err(|_| AppError::not_found(entity))
}

/// For patch fields where `null` means "clear": absent → `None`,
/// `null` → `Some(None)`, value → `Some(Some(v))`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::AuthConfig;
    use crate::db::{self, seed, Backend};
    use crate::{create_app, AppState};

    /// Seeded in-memory app state with a cheap bcrypt cost.
    pub async fn test_state() -> AppState {
        let pool = db::test_support::empty_pool().await;
        seed::seed_defaults(&pool, &seed::test_admin_seed(), 4).await.unwrap();
        AppState {
            pool,
            backend: Backend::Sqlite,
            auth: AuthConfig {
                jwt_secret: "test-secret".to_string(),
                token_ttl_minutes: 60,
                bcrypt_cost: 4,
            },
        }
    }

    pub async fn test_app() -> (Router, AppState) {
        let state = test_state().await;
        (create_app(state.clone()), state)
    }

    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn login(app: &Router) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/admin/login",
            None,
            Some(serde_json::json!({"username": "admin", "password": "admin123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["token"].as_str().unwrap().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        excerpt: Option<Option<String>>,
    }

    #[test]
    fn test_double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.excerpt, None);
        let null: Patch = serde_json::from_str(r#"{"excerpt": null}"#).unwrap();
        assert_eq!(null.excerpt, Some(None));
        let set: Patch = serde_json::from_str(r#"{"excerpt": "x"}"#).unwrap();
        assert_eq!(set.excerpt, Some(Some("x".to_string())));
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42", "Post").unwrap(), 42);
        assert!(matches!(parse_id("abc", "Post"), Err(AppError::NotFound(_))));
    }
}
