use crate::services::ai_router::{AiRouterRequest, AiRouterService};
use crate::utils::error::ApiError;
use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct AiRouterResponse {
    pub ok: bool,
    pub data: Value,
}

/// POST /api/ai/router
///
/// The body is parsed by hand so a malformed payload gets the route's own 400
/// instead of axum's JSON rejection.
pub async fn route_prompt(
    State(router): State<Arc<AiRouterService>>,
    body: Bytes,
) -> Result<Json<AiRouterResponse>, ApiError> {
    let request: AiRouterRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON payload".to_string()))?;
    let (restaurant_id, message) = request.validated()?;

    info!("AI router prompt for restaurant {}", restaurant_id);
    let data = router.route(&restaurant_id, &message).await?;

    Ok(Json(AiRouterResponse { ok: true, data }))
}
