//! Request tracing middleware

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use super::client_ip::client_ip;

/// Logs every request with its status and duration
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = client_ip(request.headers());

    let start = Instant::now();
    tracing::debug!(method = %method, path = %path, client_ip = ?client_ip, "Request started");

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if response.status().is_server_error() {
        tracing::error!(method = %method, path = %path, status, duration_ms, "Request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(
            method = %method,
            path = %path,
            status,
            duration_ms,
            "Request completed with client error"
        );
    } else {
        tracing::info!(method = %method, path = %path, status, duration_ms, "Request completed");
    }

    response
}
