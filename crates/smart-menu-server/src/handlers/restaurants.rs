use super::relay_upstream;
use crate::services::BackendClient;
use axum::{
    extract::{Path, Query, State},
    response::Response,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct KindParams {
    pub kind: Option<String>,
}

/// GET /api/restaurants
pub async fn list_restaurants(State(backend): State<Arc<BackendClient>>) -> Response {
    relay_upstream(
        backend.restaurants().await,
        json!({ "ok": false, "data": null }),
        Value::Null,
    )
}

/// GET /api/restaurants/{restaurantId}
pub async fn get_restaurant(
    State(backend): State<Arc<BackendClient>>,
    Path(restaurant_id): Path<String>,
) -> Response {
    relay_upstream(
        backend.restaurant(&restaurant_id).await,
        json!({ "ok": false, "data": null }),
        Value::Null,
    )
}

/// GET /api/restaurants/{restaurantId}/categories?kind=
///
/// Only `kind` is forwarded.
pub async fn list_categories(
    State(backend): State<Arc<BackendClient>>,
    Path(restaurant_id): Path<String>,
    Query(params): Query<KindParams>,
) -> Response {
    debug!("Categories for {} (kind {:?})", restaurant_id, params.kind);
    relay_upstream(
        backend.categories(&restaurant_id, params.kind.as_deref()).await,
        json!({ "ok": false, "data": [] }),
        json!([]),
    )
}
