use crate::services::push::{PushService, PushSubscription};
use crate::utils::error::ApiError;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    pub device_id: String,
    pub subscription: PushSubscription,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub device_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VapidKeyResponse {
    pub public_key: String,
}

/// POST /api/push/subscribe
pub async fn subscribe(
    State(push): State<Arc<PushService>>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    push.subscribe(&request.device_id, request.subscription).await?;
    info!("Push subscription saved for device {}", request.device_id);
    Ok(Json(SuccessResponse { success: true }))
}

/// DELETE /api/push/subscribe/{deviceId}
pub async fn unsubscribe(
    State(push): State<Arc<PushService>>,
    Path(device_id): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    push.unsubscribe(&device_id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/push/send
pub async fn send(
    State(push): State<Arc<PushService>>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message is required".to_string()));
    }
    push.send_notification(&request.device_id, &request.message).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/push/vapid-public-key
pub async fn vapid_public_key(
    State(push): State<Arc<PushService>>,
) -> Result<Json<VapidKeyResponse>, ApiError> {
    let public_key = push
        .vapid_public_key()
        .ok_or_else(|| ApiError::Configuration("VAPID public key is not configured.".to_string()))?;
    Ok(Json(VapidKeyResponse {
        public_key: public_key.to_string(),
    }))
}
