use super::relay_upstream;
use super::restaurants::KindParams;
use crate::services::BackendClient;
use axum::{
    extract::{Path, Query, RawQuery, State},
    response::Response,
};
use serde_json::Value;
use std::sync::Arc;

/// GET /api/menuItems/{restaurantId}/menu-items
///
/// The query string (`kind`, `categoryId`, `subcategoryId`, `popular`,
/// `limit`, ...) is forwarded untouched.
pub async fn list_menu_items(
    State(backend): State<Arc<BackendClient>>,
    Path(restaurant_id): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    relay_upstream(
        backend.menu_items(&restaurant_id, query.as_deref()).await,
        Value::Null,
        Value::Null,
    )
}

/// GET /api/menuItems/{restaurantId}/menu-items/{itemId}?kind=
pub async fn get_menu_item(
    State(backend): State<Arc<BackendClient>>,
    Path((restaurant_id, item_id)): Path<(String, String)>,
    Query(params): Query<KindParams>,
) -> Response {
    relay_upstream(
        backend
            .menu_item(&restaurant_id, &item_id, params.kind.as_deref())
            .await,
        Value::Null,
        Value::Null,
    )
}
