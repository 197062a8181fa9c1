pub mod config;
pub mod handlers;
pub mod i18n;
pub mod menu;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

pub use state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Public routes
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/sitemap.xml", get(handlers::sitemap::sitemap));

    // Backend proxy routes
    let proxy_routes = Router::new()
        .route("/api/restaurants", get(handlers::restaurants::list_restaurants))
        .route(
            "/api/restaurants/{restaurant_id}",
            get(handlers::restaurants::get_restaurant),
        )
        .route(
            "/api/restaurants/{restaurant_id}/categories",
            get(handlers::restaurants::list_categories),
        )
        .route(
            "/api/menuItems/{restaurant_id}/menu-items",
            get(handlers::menu_items::list_menu_items),
        )
        .route(
            "/api/menuItems/{restaurant_id}/menu-items/{item_id}",
            get(handlers::menu_items::get_menu_item),
        )
        .route("/api/ai/router", post(handlers::ai::route_prompt));

    // Push subscriptions
    let push_routes = Router::new()
        .route("/api/push/subscribe", post(handlers::push::subscribe))
        .route(
            "/api/push/subscribe/{device_id}",
            delete(handlers::push::unsubscribe),
        )
        .route("/api/push/send", post(handlers::push::send))
        .route("/api/push/vapid-public-key", get(handlers::push::vapid_public_key));

    // Server-rendered storefront
    let page_routes = Router::new()
        .route(
            "/{locale}/restaurant/{restaurant_id}",
            get(handlers::pages::restaurant_page),
        )
        .route(
            "/{locale}/restaurant/{restaurant_id}/ai-assistant",
            get(handlers::pages::assistant_page),
        )
        .route(
            "/{locale}/restaurant/{restaurant_id}/menuItem/{item_id}",
            get(handlers::pages::menu_item_page),
        )
        .route(
            "/{locale}/restaurant/{restaurant_id}/menuItem/{item_id}/favorite",
            post(handlers::pages::toggle_favorite),
        );

    Router::new()
        .merge(public_routes)
        .merge(proxy_routes)
        .merge(push_routes)
        .merge(page_routes)
        .fallback(handlers::pages::not_found)
        .with_state(state)
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CatchPanicLayer::new())
}
