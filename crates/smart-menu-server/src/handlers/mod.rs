pub mod ai;
pub mod health;
pub mod menu_items;
pub mod pages;
pub mod push;
pub mod restaurants;
pub mod sitemap;

use crate::services::backend::UpstreamResponse;
use crate::utils::error::ApiError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

/// Passes the upstream body through with its status. A non-JSON body is
/// replaced by `malformed`; a failed call renders the error envelope with
/// `error_data` as its `data`.
pub(crate) fn relay_upstream(
    result: Result<UpstreamResponse, ApiError>,
    malformed: Value,
    error_data: Value,
) -> Response {
    match result {
        Ok(response) => {
            let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let body = response.body.unwrap_or_else(|| {
                tracing::warn!("Upstream answered {} with a malformed body", response.status);
                malformed
            });
            (status, Json(body)).into_response()
        }
        Err(e) => e.into_response_with_data(error_data),
    }
}
