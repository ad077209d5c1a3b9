use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};

/// Log every request once on the way in and once with its outcome.
/// Admin bearer tokens never reach the log: only method and path are kept.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let req_id: String = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    tracing::debug!(request_id = %req_id, method = %method, path = %path, "incoming request");

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            request_id = %req_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms,
            "request failed"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            request_id = %req_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms,
            "request rejected"
        );
    } else {
        tracing::info!(
            request_id = %req_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            duration_ms,
            "request completed"
        );
    }

    response
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
