use axum::{
    Router,
    body::Body,
    http::{Request, header},
    routing::get,
};
use tower::ServiceExt;

use profile_card::config::CorsConfig;
use profile_card::cors::build_cors_layer;

fn cors(origins: &[&str]) -> CorsConfig {
    CorsConfig {
        enabled: true,
        allowed_origins: origins.iter().map(|s| s.to_string()).collect(),
        max_age_secs: Some(600),
    }
}

#[tokio::test]
async fn cors_layer_adds_allow_origin_header() {
    let layer = build_cors_layer(&cors(&["https://example.com"])).expect("cors layer");
    let app = Router::new()
        .route("/card", get(|| async { "ok" }))
        .layer(layer);

    let req = Request::builder()
        .method("GET")
        .uri("/card")
        .header(header::ORIGIN, "https://example.com")
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("call app");

    let allow_origin = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .expect("missing allow origin")
        .to_str()
        .expect("invalid allow origin");
    assert_eq!(allow_origin, "https://example.com");
}

#[tokio::test]
async fn wildcard_origin_allows_any_and_preflight_lists_get() {
    let layer = build_cors_layer(&cors(&["*"])).expect("cors layer");
    let app = Router::new()
        .route("/card", get(|| async { "ok" }))
        .layer(layer);

    let req = Request::builder()
        .method("OPTIONS")
        .uri("/card")
        .header(header::ORIGIN, "https://anywhere.example")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("call app");

    let headers = resp.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let allow_methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .expect("invalid allow methods");
    assert!(allow_methods.contains("GET"));
    assert!(!allow_methods.contains("POST"));
    assert!(!allow_methods.contains("HEAD"));
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "600");
}
