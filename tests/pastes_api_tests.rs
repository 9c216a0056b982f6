use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use burnpaste::{
    AppState, build_router,
    domain::clock::{FixedClock, TEST_NOW_HEADER},
    infrastructure::{memory_kv::InMemoryKv, paste_store::PasteStore, rest_kv::UnconfiguredKv},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

const T0: i64 = 1_700_000_000_000;

fn app(test_mode: bool) -> Router {
    let store = PasteStore::new(Arc::new(InMemoryKv::new()));
    build_router(AppState::new(store, Arc::new(FixedClock::new(T0))).with_test_mode(test_mode))
}

async fn request_json(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("router should respond");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    let body = serde_json::from_slice(&bytes).expect("body should be JSON");
    (status, body)
}

fn post_paste(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/pastes")
        .header("content-type", "application/json")
        .header("host", "localhost:3000")
        .body(Body::from(body.to_string()))
        .expect("valid create request")
}

fn get_paste(id: &str, now_ms: Option<i64>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(format!("/pastes/{id}"));
    if let Some(now_ms) = now_ms {
        builder = builder.header(TEST_NOW_HEADER, now_ms.to_string());
    }
    builder.body(Body::empty()).expect("valid get request")
}

async fn create(app: &Router, body: Value) -> String {
    let (status, created) = request_json(app.clone(), post_paste(body)).await;
    assert_eq!(status, StatusCode::CREATED, "unexpected body {created}");
    created
        .get("id")
        .and_then(Value::as_str)
        .expect("created paste must include id")
        .to_string()
}

#[tokio::test]
async fn unlimited_paste_is_viewable_indefinitely() {
    let app = app(false);

    let (status, created) =
        request_json(app.clone(), post_paste(json!({"content": "hello"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created.get("id").and_then(Value::as_str).unwrap().to_string();
    assert_eq!(
        created.get("url").and_then(Value::as_str),
        Some(format!("http://localhost:3000/p/{id}").as_str())
    );

    for _ in 0..3 {
        let (status, view) = request_json(app.clone(), get_paste(&id, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            view,
            json!({"content": "hello", "remaining_views": null, "expires_at": null})
        );
    }
}

#[tokio::test]
async fn single_view_paste_is_gone_after_first_read() {
    let app = app(false);
    let id = create(&app, json!({"content": "x", "max_views": 1})).await;

    let (status, view) = request_json(app.clone(), get_paste(&id, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view.get("content").and_then(Value::as_str), Some("x"));
    assert_eq!(view.get("remaining_views").and_then(Value::as_u64), Some(0));

    let (status, problem) = request_json(app, get_paste(&id, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem, json!({"error": "paste not found"}));
}

#[tokio::test]
async fn remaining_views_count_down() {
    let app = app(false);
    let id = create(&app, json!({"content": "x", "max_views": 3})).await;

    for expected in [2, 1, 0] {
        let (status, view) = request_json(app.clone(), get_paste(&id, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view.get("remaining_views").and_then(Value::as_u64), Some(expected));
    }

    let (status, _) = request_json(app, get_paste(&id, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ttl_is_enforced_with_test_clock() {
    let app = app(true);
    let id = create(&app, json!({"content": "x", "ttl_seconds": 1})).await;

    let (status, view) = request_json(app.clone(), get_paste(&id, Some(T0 + 999))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        view.get("expires_at").and_then(Value::as_str),
        Some("2023-11-14T22:13:21.000Z")
    );

    let (status, problem) = request_json(app.clone(), get_paste(&id, Some(T0 + 2_000))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem, json!({"error": "paste not found"}));

    // Deleted on the expired access, so even an earlier clock cannot revive it.
    let (status, _) = request_json(app, get_paste(&id, Some(T0))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_clock_header_is_ignored_outside_test_mode() {
    let app = app(false);
    let id = create(&app, json!({"content": "x", "ttl_seconds": 1})).await;

    let (status, _) = request_json(app, get_paste(&id, Some(T0 + 60_000))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn invalid_create_requests_are_rejected() {
    let app = app(false);

    let (status, problem) = request_json(app.clone(), post_paste(json!({"content": ""}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        problem
            .get("error")
            .and_then(Value::as_str)
            .is_some_and(|message| message.starts_with("content is required"))
    );

    let (status, problem) = request_json(
        app.clone(),
        post_paste(json!({"content": "x", "ttl_seconds": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem, json!({"error": "ttl_seconds must be an integer >= 1"}));

    let (status, problem) = request_json(
        app.clone(),
        post_paste(json!({"content": "x", "max_views": "2"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem, json!({"error": "max_views must be an integer >= 1"}));

    let malformed = Request::builder()
        .method("POST")
        .uri("/pastes")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .expect("valid malformed request");
    let (status, problem) = request_json(app.clone(), malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem, json!({"error": "Invalid request body"}));

    let (status, problem) = request_json(app.clone(), post_paste(json!(["hello", 5, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem, json!({"error": "Invalid request body"}));

    let (status, problem) = request_json(
        app.clone(),
        post_paste(json!({"content": "x", "ttl_seconds": null})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem, json!({"error": "ttl_seconds must be an integer >= 1"}));

    let (status, problem) =
        request_json(app, post_paste(json!({"content": "x", "max_views": null}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem, json!({"error": "max_views must be an integer >= 1"}));
}

#[tokio::test]
async fn create_body_is_parsed_without_content_type() {
    let app = app(false);
    let request = Request::builder()
        .method("POST")
        .uri("/pastes")
        .body(Body::from(json!({"content": "plain"}).to_string()))
        .expect("valid create request");

    let (status, created) = request_json(app.clone(), request).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created.get("id").and_then(Value::as_str).unwrap();

    let (status, view) = request_json(app, get_paste(id, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view.get("content").and_then(Value::as_str), Some("plain"));
}

#[tokio::test]
async fn shareable_url_serves_the_paste() {
    let app = app(false);
    let (status, created) = request_json(
        app.clone(),
        post_paste(json!({"content": "linked", "max_views": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let url = created.get("url").and_then(Value::as_str).unwrap();
    let path = url
        .strip_prefix("http://localhost:3000")
        .expect("url should use the request host");

    let follow = || {
        Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("valid get request")
    };
    let (status, view) = request_json(app.clone(), follow()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view.get("content").and_then(Value::as_str), Some("linked"));
    assert_eq!(view.get("remaining_views").and_then(Value::as_u64), Some(1));

    // Views through the link count against the same cap.
    let id = created.get("id").and_then(Value::as_str).unwrap();
    let (status, _) = request_json(app.clone(), get_paste(id, None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, problem) = request_json(app, follow()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem, json!({"error": "paste not found"}));
}

#[tokio::test]
async fn unknown_paste_is_not_found() {
    let (status, problem) = request_json(app(false), get_paste("doesnotexist", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem, json!({"error": "paste not found"}));
}

#[tokio::test]
async fn api_prefixed_routes_serve_the_same_handlers() {
    let app = app(false);

    let request = Request::builder()
        .method("POST")
        .uri("/api/pastes")
        .header("content-type", "application/json")
        .header("host", "paste.example.com")
        .body(Body::from(json!({"content": "aliased"}).to_string()))
        .expect("valid create request");
    let (status, created) = request_json(app.clone(), request).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created.get("id").and_then(Value::as_str).unwrap().to_string();
    assert_eq!(
        created.get("url").and_then(Value::as_str),
        Some(format!("https://paste.example.com/p/{id}").as_str())
    );

    let request = Request::builder()
        .uri(format!("/api/pastes/{id}"))
        .body(Body::empty())
        .expect("valid get request");
    let (status, view) = request_json(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view.get("content").and_then(Value::as_str), Some("aliased"));
}

#[tokio::test]
async fn configured_base_url_is_used_for_links() {
    let store = PasteStore::new(Arc::new(InMemoryKv::new()));
    let app = build_router(
        AppState::new(store, Arc::new(FixedClock::new(T0)))
            .with_public_base_url(Some("https://burn.example/".to_string())),
    );

    let (status, created) = request_json(app, post_paste(json!({"content": "x"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created.get("id").and_then(Value::as_str).unwrap();
    assert_eq!(
        created.get("url").and_then(Value::as_str),
        Some(format!("https://burn.example/p/{id}").as_str())
    );
}

#[tokio::test]
async fn health_reports_store_state_with_200() {
    let request = || {
        Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .expect("valid health request")
    };

    let (status, health) = request_json(app(false), request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health, json!({"ok": true}));

    let broken = build_router(AppState::new(
        PasteStore::new(Arc::new(UnconfiguredKv)),
        Arc::new(FixedClock::new(T0)),
    ));
    let (status, health) = request_json(broken, request()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        health,
        json!({"ok": false, "error": "Redis environment variables not configured"})
    );
}

#[tokio::test]
async fn store_failures_surface_as_500() {
    let broken = build_router(AppState::new(
        PasteStore::new(Arc::new(UnconfiguredKv)),
        Arc::new(FixedClock::new(T0)),
    ));

    let (status, problem) = request_json(broken.clone(), get_paste("anything", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(problem.get("error").and_then(Value::as_str).is_some());

    let (status, _) = request_json(broken, post_paste(json!({"content": "x"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
