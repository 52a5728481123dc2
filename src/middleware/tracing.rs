//! Request tracing middleware

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::Level;

use super::auth::USER_ID_HEADER;

/// Middleware logging one line per request with timing and caller identity.
///
/// The caller field comes from the gateway-forwarded `x-user-id` header and
/// may be absent on unauthenticated routes such as `/health`.
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let caller = request
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let start = Instant::now();
    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis();

    let level = if status.is_server_error() {
        Level::ERROR
    } else if status.is_client_error() {
        Level::WARN
    } else {
        Level::INFO
    };

    match level {
        Level::ERROR => tracing::error!(
            method = %method,
            path = %path,
            caller = ?caller,
            status = %status.as_u16(),
            duration_ms = %duration_ms,
            "request failed"
        ),
        Level::WARN => tracing::warn!(
            method = %method,
            path = %path,
            caller = ?caller,
            status = %status.as_u16(),
            duration_ms = %duration_ms,
            "request rejected"
        ),
        _ => tracing::info!(
            method = %method,
            path = %path,
            caller = ?caller,
            status = %status.as_u16(),
            duration_ms = %duration_ms,
            "request completed"
        ),
    }

    response
}
