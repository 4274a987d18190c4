mod common;

use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{Request, StatusCode, header},
};
use std::time::Duration;
use tower::ServiceExt;

use profile_card::app::build_router;
use profile_card::cache::CardStore;
use profile_card::config::AppConfig;
use profile_card::features::github::stats_cache_key;

use common::{FakeStats, TestHarness, harness};

fn app(h: &TestHarness) -> Router {
    build_router(h.state.clone(), &AppConfig::default())
}

async fn get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Bytes) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .expect("call app");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, headers, body)
}

fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).expect("json body")
}

#[tokio::test]
async fn missing_username_is_rejected_before_fetching() {
    let h = harness(FakeStats::ok());
    let (status, _, body) = get(app(&h), "/card?theme=dark").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json(&body)["message"],
        "GitHub username (username) is required."
    );
    assert_eq!(h.stats.call_count(), 0);
}

#[tokio::test]
async fn invalid_username_is_rejected() {
    let h = harness(FakeStats::ok());
    let (status, _, body) = get(app(&h), "/card?username=bad%2Fname").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json(&body)["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid GitHub username")
    );
}

#[tokio::test]
async fn non_get_methods_get_json_405() {
    let h = harness(FakeStats::ok());
    for method in ["POST", "PUT", "DELETE"] {
        let resp = app(&h)
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri("/card?username=alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("call app");

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{method}");
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(json(&body)["message"], "Method not allowed.");
    }
    assert_eq!(h.stats.call_count(), 0);
}

#[tokio::test]
async fn head_is_rejected_without_rendering() {
    let h = harness(FakeStats::ok());
    let resp = app(&h)
        .oneshot(
            Request::builder()
                .method("HEAD")
                .uri("/card?username=alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("call app");

    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_ne!(
        resp.headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("image/png")
    );
    assert_eq!(h.stats.call_count(), 0);

    // HEAD 未写入缓存，随后的 GET 仍是首次生成
    let (status, headers, _) = get(app(&h), "/card?username=alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-card-cache"], "MISS");
}

#[tokio::test]
async fn repeated_optional_param_falls_back_to_default() {
    let h = harness(FakeStats::ok());
    let (status, headers, _) =
        get(app(&h), "/card?username=alice&theme=dark&theme=light").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");

    // 重复的 theme 视为缺省，与不带 theme 的请求共用缓存
    let (status, headers, _) = get(app(&h), "/card?username=alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-card-cache"], "HIT");
}

#[tokio::test]
async fn repeated_username_is_a_json_400() {
    let h = harness(FakeStats::ok());
    let (status, headers, body) = get(app(&h), "/card?username=alice&username=bob").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json")
    );
    assert_eq!(
        json(&body)["message"],
        "GitHub username (username) is required."
    );
    assert_eq!(h.stats.call_count(), 0);
}

#[tokio::test]
async fn renders_png_and_serves_repeat_from_cache() {
    let h = harness(FakeStats::ok());
    let uri = "/card?username=alice&theme=dark&skills=Go,Rust";

    let (status, headers, first) = get(app(&h), uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
    assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=86400");
    assert_eq!(headers["x-card-cache"], "MISS");
    assert_eq!(&first[..8], b"\x89PNG\r\n\x1a\n");

    let decoded = image::load_from_memory(&first).expect("decode png");
    assert_eq!((decoded.width(), decoded.height()), (600, 400));

    let (status, headers, second) = get(app(&h), uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-card-cache"], "HIT");
    assert_eq!(first, second);
    assert_eq!(h.stats.call_count(), 1);
}

#[tokio::test]
async fn prefixed_route_shares_the_card_cache() {
    let h = harness(FakeStats::ok());
    let (status, _, _) = get(app(&h), "/card?username=alice").await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, _) = get(app(&h), "/api/card?username=alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-card-cache"], "HIT");
    assert_eq!(h.stats.call_count(), 1);
}

#[tokio::test]
async fn nocache_clears_both_entries_and_forces_refresh() {
    let h = harness(FakeStats::ok());
    let (status, _, stale) = get(app(&h), "/card?username=alice").await;
    assert_eq!(status, StatusCode::OK);

    h.store
        .set(
            &stats_cache_key("alice"),
            Bytes::from_static(b"{}"),
            Duration::from_secs(60),
        )
        .await;

    let (status, headers, fresh) = get(app(&h), "/card?username=alice&nocache=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-card-cache"], "MISS");
    // 返回的是按刷新后统计重新渲染的图片，而不是旧缓存
    assert_ne!(stale, fresh);
    assert!(h.store.get(&stats_cache_key("alice")).await.is_none());
    assert_eq!(h.stats.call_count(), 2);
    assert_eq!(*h.stats.forced.lock().unwrap(), vec![false, true]);

    // 刷新后的结果重新写入同一个卡片缓存键
    let (_, headers, cached) = get(app(&h), "/card?username=alice").await;
    assert_eq!(headers["x-card-cache"], "HIT");
    assert_eq!(cached, fresh);
    assert_eq!(h.stats.call_count(), 2);
}

#[tokio::test]
async fn unknown_theme_falls_back_instead_of_failing() {
    let h = harness(FakeStats::ok());
    let (status, headers, _) = get(app(&h), "/card?username=alice&theme=neon&opacity=abc").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/png");
}

#[tokio::test]
async fn stats_failure_returns_500_with_raw_error() {
    let h = harness(FakeStats::failing());
    let (status, _, body) = get(app(&h), "/card?username=alice").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = json(&body);
    assert_eq!(body["message"], "Failed to generate the card.");
    assert!(body["error"].as_str().unwrap().contains("rate limited"));
    assert!(body["requestId"].as_str().is_some());
}

#[tokio::test]
async fn svg_format_returns_markup_with_skill_badges() {
    let h = harness(FakeStats::ok());
    let (status, headers, body) = get(
        app(&h),
        "/card?username=alice&skills=Go,%20Rust,,&format=svg&name=%3CAlice%3E",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "image/svg+xml; charset=utf-8"
    );
    let svg = String::from_utf8(body.to_vec()).expect("utf8");
    assert_eq!(svg.matches(r#"class="skill-badge""#).count(), 2);
    assert!(svg.contains("&lt;Alice&gt;"));
    assert!(svg.contains("Commits | "));
    // 优化失败时 SVG 输出保留原始头像地址
    assert!(svg.contains("https://avatars.example/alice.png"));
}

#[tokio::test]
async fn health_reports_service_name() {
    let h = harness(FakeStats::ok());
    let (status, _, body) = get(app(&h), "/health").await;
    assert_eq!(status, StatusCode::OK);
    let body = json(&body);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "profile-card");
}
