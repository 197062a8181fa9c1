use super::{get, get_json, post_json, send, test_router};
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn missing_backend_answers_500() {
    let router = test_router(None, |_| {}).await;

    let (status, body) = get_json(&router, "/api/restaurants").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["ok"], false);
    assert_eq!(body["data"], json!(null));
    assert_eq!(body["message"], "BACKEND_URL is not configured.");

    let (status, body) = get_json(&router, "/api/restaurants/r1/categories?kind=food").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn upstream_status_and_body_pass_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/restaurants/r1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "ok": false, "message": "Restaurant not found" })))
        .mount(&server)
        .await;

    let router = test_router(Some(server.uri()), |_| {}).await;
    let (status, body) = get_json(&router, "/api/restaurants/r1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "ok": false, "message": "Restaurant not found" }));
}

#[tokio::test]
async fn malformed_upstream_bodies_get_route_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;
    let router = test_router(Some(server.uri()), |_| {}).await;

    let (status, body) = get_json(&router, "/api/restaurants").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "ok": false, "data": null }));

    let (_, body) = get_json(&router, "/api/restaurants/r1/categories").await;
    assert_eq!(body, json!({ "ok": false, "data": [] }));

    let (status, body) = get_json(&router, "/api/menuItems/r1/menu-items?kind=food").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!(null));
}

#[tokio::test]
async fn categories_forward_only_kind() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/restaurants/r1/categories"))
        .and(query_param("kind", "drink"))
        .and(query_param_is_missing("categoryId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let router = test_router(Some(server.uri()), |_| {}).await;
    let (status, body) = get_json(&router, "/api/restaurants/r1/categories?kind=drink&categoryId=c1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn menu_items_forward_whole_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/menuItems/r1/menu-items"))
        .and(query_param("kind", "food"))
        .and(query_param("popular", "true"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "data": [{ "_id": "p1" }] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/menuItems/r1/menu-items/i1"))
        .and(query_param("kind", "drink"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "data": { "_id": "i1" } })))
        .expect(1)
        .mount(&server)
        .await;

    let router = test_router(Some(server.uri()), |_| {}).await;
    let (_, body) = get_json(&router, "/api/menuItems/r1/menu-items?kind=food&popular=true&limit=5").await;
    assert_eq!(body["data"][0]["_id"], "p1");

    let (_, body) = get_json(&router, "/api/menuItems/r1/menu-items/i1?kind=drink").await;
    assert_eq!(body["data"]["_id"], "i1");
}

#[tokio::test]
async fn ai_router_validates_payload() {
    let router = test_router(None, |_| {}).await;

    let (status, body) = post_json(&router, "/api/ai/router", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid JSON payload");

    let (status, body) = post_json(&router, "/api/ai/router", r#"{"restaurantId":"r1","message":"  "}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Both restaurantId and message are required");
}

#[tokio::test]
async fn ai_router_maps_upstream_outcomes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/ai/router"))
        .and(header("authorization", "Bearer token-1"))
        .and(body_json(json!({ "restaurantId": "r1", "message": "spicy" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "router": { "assistantText": "Try the chili", "language": "en" },
            "candidates": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/ai/router"))
        .and(body_json(json!({ "restaurantId": "r2", "message": "spicy" })))
        .respond_with(ResponseTemplate::new(502).set_body_json(json!({ "message": "model offline" })))
        .mount(&server)
        .await;

    let url = format!("{}/api/ai/router", server.uri());
    let router = test_router(None, move |settings| {
        settings.ai_router.service_url = url;
        settings.ai_router.service_token = Some("token-1".into());
    })
    .await;

    let (status, body) = post_json(&router, "/api/ai/router", r#"{"restaurantId":"r1","message":"spicy"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["router"]["assistantText"], "Try the chili");

    let (status, body) = post_json(&router, "/api/ai/router", r#"{"restaurantId":"r2","message":"spicy"}"#).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["ok"], false);
    assert_eq!(body["message"], "model offline");
}

#[tokio::test]
async fn ai_router_unreachable_is_500() {
    let router = test_router(None, |settings| {
        settings.ai_router.service_url = "http://127.0.0.1:1/api/ai/router".into();
    })
    .await;

    let (status, body) = post_json(&router, "/api/ai/router", r#"{"restaurantId":"r1","message":"hi"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Unable to reach AI router service");
}

#[tokio::test]
async fn push_routes_store_and_remove_subscriptions() {
    let router = test_router(None, |settings| {
        settings.push.vapid_public_key = Some("public-key".into());
    })
    .await;

    let (status, body) = get_json(&router, "/api/push/vapid-public-key").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publicKey"], "public-key");

    let subscribe = json!({
        "deviceId": "device-1",
        "subscription": {
            "endpoint": "https://push.example.com/abc",
            "expirationTime": null,
            "keys": { "p256dh": "p", "auth": "a" }
        }
    });
    let (status, body) = post_json(&router, "/api/push/subscribe", &subscribe.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    // Relay is not configured, so delivery fails after the lookup succeeds.
    let (status, _) = post_json(&router, "/api/push/send", r#"{"deviceId":"device-1","message":"hi"}"#).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let request = Request::delete("/api/push/subscribe/device-1").body(Body::empty()).unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post_json(&router, "/api/push/send", r#"{"deviceId":"device-1","message":"hi"}"#).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No subscription available");
}

#[tokio::test]
async fn health_and_sitemap() {
    let router = test_router(None, |_| {}).await;

    let (status, body) = get_json(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = get_json(&router, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["backend_configured"], false);

    let (status, xml) = get(&router, "/sitemap.xml").await;
    assert_eq!(status, StatusCode::OK);
    assert!(xml.contains("<loc>https://www.smartmenumk.com/mk/za-nas</loc>"));
}
