use crate::config::Settings;
use crate::menu::storage::{CookieStorage, Favorites};
use crate::services::pages::RenderedPage;
use crate::services::StorefrontPages;
use crate::utils::error::ApiError;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use super::restaurants::KindParams;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PromptParams {
    pub prompt: Option<String>,
}

fn html_response(result: Result<RenderedPage, ApiError>, revalidate_seconds: u64) -> Response {
    match result {
        Ok(page) => {
            let status = if page.found { StatusCode::OK } else { StatusCode::NOT_FOUND };
            let mut response = (status, Html(page.html)).into_response();
            if page.found {
                let cache = format!("public, s-maxage={revalidate_seconds}, stale-while-revalidate");
                if let Ok(value) = HeaderValue::from_str(&cache) {
                    response.headers_mut().insert(header::CACHE_CONTROL, value);
                }
            }
            response
        }
        Err(e) => e.into_response(),
    }
}

/// GET /{locale}/restaurant/{restaurantId}
pub async fn restaurant_page(
    State(pages): State<Arc<StorefrontPages>>,
    State(settings): State<Arc<Settings>>,
    Path((locale, restaurant_id)): Path<(String, String)>,
    uri: Uri,
) -> Response {
    let location = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    html_response(
        pages.restaurant_page(&locale, &restaurant_id, location).await,
        settings.prefetch.revalidate_seconds,
    )
}

fn visitor_storage(headers: &HeaderMap) -> Arc<CookieStorage> {
    let cookies = headers.get(header::COOKIE).and_then(|v| v.to_str().ok());
    Arc::new(CookieStorage::from_header(cookies))
}

/// GET /{locale}/restaurant/{restaurantId}/menuItem/{itemId}
pub async fn menu_item_page(
    State(pages): State<Arc<StorefrontPages>>,
    State(settings): State<Arc<Settings>>,
    Path((locale, restaurant_id, item_id)): Path<(String, String, String)>,
    Query(params): Query<KindParams>,
    headers: HeaderMap,
) -> Response {
    let favorites = Favorites::new(visitor_storage(&headers));
    let mut response = html_response(
        pages
            .menu_item_page(&locale, &restaurant_id, &item_id, params.kind.as_deref(), &favorites)
            .await,
        settings.prefetch.revalidate_seconds,
    );
    // The favorite state comes from the visitor's cookies.
    if response.status() == StatusCode::OK {
        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("private, no-cache"));
        headers.insert(header::VARY, HeaderValue::from_static("cookie"));
    }
    response
}

/// POST /{locale}/restaurant/{restaurantId}/menuItem/{itemId}/favorite
pub async fn toggle_favorite(
    State(pages): State<Arc<StorefrontPages>>,
    Path((locale, restaurant_id, item_id)): Path<(String, String, String)>,
    Query(params): Query<KindParams>,
    headers: HeaderMap,
) -> Response {
    let storage = visitor_storage(&headers);
    let location = pages.toggle_favorite(
        &locale,
        &restaurant_id,
        &item_id,
        params.kind.as_deref(),
        &Favorites::new(storage.clone()),
    );

    let mut response = Redirect::to(&location).into_response();
    for cookie in storage.set_cookie_headers() {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!("Dropping invalid favorites cookie: {}", e),
        }
    }
    response
}

/// GET /{locale}/restaurant/{restaurantId}/ai-assistant?prompt=
pub async fn assistant_page(
    State(pages): State<Arc<StorefrontPages>>,
    State(settings): State<Arc<Settings>>,
    Path((locale, restaurant_id)): Path<(String, String)>,
    Query(params): Query<PromptParams>,
) -> Response {
    let mut response = html_response(
        pages
            .assistant_page(&locale, &restaurant_id, params.prompt.as_deref())
            .await,
        settings.prefetch.revalidate_seconds,
    );
    // Answers and remaining credits change per request.
    if response.status() == StatusCode::OK {
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }
    response
}

/// Fallback for every unmatched route.
pub async fn not_found(
    State(pages): State<Arc<StorefrontPages>>,
    State(settings): State<Arc<Settings>>,
) -> Response {
    html_response(
        pages.not_found_page(settings.i18n.default_locale),
        settings.prefetch.revalidate_seconds,
    )
}
