use crate::config::Settings;
use crate::services::BackendClient;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    version: String,
}

pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    ready: bool,
    backend_configured: bool,
    push_relay_configured: bool,
}

/// Ready once the menu backend is configured; the push relay is reported
/// but optional.
pub async fn readiness_check(
    State(backend): State<Arc<BackendClient>>,
    State(settings): State<Arc<Settings>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    let backend_configured = backend.is_configured();
    let status = if backend_configured {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadinessResponse {
            ready: backend_configured,
            backend_configured,
            push_relay_configured: settings
                .push
                .relay_url
                .as_deref()
                .is_some_and(|url| !url.trim().is_empty()),
        }),
    )
}
