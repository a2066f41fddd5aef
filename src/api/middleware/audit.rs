//! Access logging middleware.
//!
//! Emits one tracing event per request with a request id, method, path,
//! response status, latency and (on protected routes) the calling user.
//! The id is echoed back in `X-Request-Id`.

use std::time::Instant;

use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::accounts::Actor;

pub async fn log_access(req: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    // Set by the auth middleware on protected routes.
    let user_id = req.extensions().get::<Actor>().map(|a| a.user_id);
    let started = Instant::now();

    let mut response = next.run(req).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    if response.status().is_server_error() {
        tracing::warn!(%request_id, %method, %path, status, ?user_id, latency_ms, "API request failed");
    } else {
        tracing::info!(%request_id, %method, %path, status, ?user_id, latency_ms, "API request");
    }

    if let Ok(val) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("X-Request-Id", val);
    }
    response
}
