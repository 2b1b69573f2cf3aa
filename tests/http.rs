use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{
        Method, Request, StatusCode,
        header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
    },
};
use http_body_util::BodyExt;
use tower::ServiceExt;

use taccuino::{
    application::{reader::ContentReader, secrets::SecretToken, writer::ContentWriter},
    cache::ResponseCache,
    config::CacheSettings,
    infra::{
        http::{ApiState, PublicState, RouterState, build_router},
        store::MemoryStore,
    },
};

const PUBLISH_SECRET: &str = "publish-secret";
const WEBHOOK_SECRET: &str = "webhook-secret";

const LIST_PAYLOAD: &str = r#"{
    "data": [{
        "attributes": {
            "slug": "hello-world",
            "title": "Hello World",
            "summary": "First post",
            "image": "cover.png",
            "createdAt": "2022-01-01T00:00:00Z",
            "updatedAt": "2022-01-02T00:00:00Z",
            "readTime": "3 min",
            "authors": {"data": [{"attributes": {"name": "M", "url": "https://example.com", "avatar": "a.png"}}]}
        }
    }]
}"#;

const DOCUMENT_PAYLOAD: &str = r#"{
    "slug": "hello-world",
    "frontmatter": {"title": "Hello World", "summary": "First post"},
    "code": "<h1>Hello</h1>",
    "html": "<article><h1>Hello</h1></article>",
    "hash": "abc123"
}"#;

fn cache_settings() -> CacheSettings {
    CacheSettings {
        capacity: NonZeroUsize::new(16),
        client_max_age: Duration::from_secs(300),
        shared_max_age: Duration::from_secs(30),
    }
}

fn app_with(store: Arc<MemoryStore>, cache: Option<Arc<ResponseCache>>) -> Router {
    app_with_secrets(
        store,
        cache,
        Some(PUBLISH_SECRET.to_string()),
        Some(WEBHOOK_SECRET.to_string()),
    )
}

fn app_with_secrets(
    store: Arc<MemoryStore>,
    cache: Option<Arc<ResponseCache>>,
    publish_secret: Option<String>,
    webhook_secret: Option<String>,
) -> Router {
    let settings = cache_settings();
    let reader = ContentReader::new(store.clone());
    let writer = ContentWriter::new(store);

    build_router(RouterState {
        public: PublicState::new(reader, cache.clone(), &settings),
        api: ApiState {
            writer,
            publish_token: SecretToken::new(publish_secret),
            webhook_token: SecretToken::new(webhook_secret),
            cache,
        },
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

fn get_conditional(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(IF_NONE_MATCH, token)
        .body(Body::empty())
        .expect("request should build")
}

fn post(uri: &str, bearer: Option<&str>, payload: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json");
    if let Some(bearer) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {bearer}"));
    }
    builder
        .body(Body::from(payload.to_string()))
        .expect("request should build")
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes()
        .to_vec()
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = app_with(Arc::new(MemoryStore::new()), None);
    let response = app.oneshot(get("/_health")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn empty_store_lists_an_empty_array() {
    let app = app_with(Arc::new(MemoryStore::new()), None);
    let response = app.oneshot(get("/blog")).await.expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok()),
        Some("public, max-age=300, s-maxage=30")
    );
    assert_eq!(body_bytes(response).await, b"[]");
}

#[tokio::test]
async fn publish_read_delete_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let app = app_with(store.clone(), None);

    // Replace the list record from a CMS export.
    let response = app
        .clone()
        .oneshot(post("/api/blog", Some(PUBLISH_SECRET), LIST_PAYLOAD))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Store the compiled document.
    let response = app
        .clone()
        .oneshot(post("/api/blog", Some(PUBLISH_SECRET), DOCUMENT_PAYLOAD))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The list is served normalized, wrapper envelopes gone.
    let response = app.clone().oneshot(get("/blog")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let list: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json list");
    assert_eq!(list[0]["slug"], "hello-world");
    assert_eq!(list[0]["readTime"], "3 min");
    assert_eq!(list[0]["authors"][0]["name"], "M");

    // A fresh article read carries the validation token.
    let response = app
        .clone()
        .oneshot(get("/blog/hello-world"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(ETAG).and_then(|v| v.to_str().ok()),
        Some("abc123")
    );
    let article: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json article");
    assert_eq!(article["slug"], "hello-world");
    assert_eq!(article["code"], "<h1>Hello</h1>");
    assert!(article.get("html").is_none());

    // A matching token short-circuits with an empty body.
    let response = app
        .clone()
        .oneshot(get_conditional("/blog/hello-world", "abc123"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert!(body_bytes(response).await.is_empty());

    // A stale token reads fresh again.
    let response = app
        .clone()
        .oneshot(get_conditional("/blog/hello-world", "something-else"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    // The webhook removes the document and the list entry.
    let response = app
        .clone()
        .oneshot(post(
            "/api/blog/webhook",
            Some(WEBHOOK_SECRET),
            r#"{"event": "entry.delete", "model": "article", "entry": {"slug": "hello-world"}}"#,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .clone()
        .oneshot(get("/blog/hello-world"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/blog")).await.expect("response");
    assert_eq!(body_bytes(response).await, b"[]");
}

#[tokio::test]
async fn unknown_article_is_not_found() {
    let app = app_with(Arc::new(MemoryStore::new()), None);
    let response = app.oneshot(get("/blog/missing")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn record_without_hash_never_emits_a_validation_token() {
    let store = Arc::new(MemoryStore::new());
    store.insert_raw(
        "article/plain",
        r#"{"slug": "plain", "frontmatter": {"title": "Plain"}, "code": "<p>x</p>"}"#,
    );
    let app = app_with(store, None);

    let response = app
        .clone()
        .oneshot(get_conditional("/blog/plain", "anything"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(ETAG).is_none());
}

#[tokio::test]
async fn write_endpoints_reject_missing_and_wrong_tokens() {
    let app = app_with(Arc::new(MemoryStore::new()), None);

    let response = app
        .clone()
        .oneshot(post("/api/blog", None, DOCUMENT_PAYLOAD))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(post("/api/blog", Some("wrong"), DOCUMENT_PAYLOAD))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The webhook secret does not open the publish endpoint.
    let response = app
        .clone()
        .oneshot(post("/api/blog", Some(WEBHOOK_SECRET), DOCUMENT_PAYLOAD))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post(
            "/api/blog/webhook",
            None,
            r#"{"event": "entry.delete", "model": "article", "entry": {}}"#,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unconfigured_secret_fails_closed() {
    let app = app_with_secrets(Arc::new(MemoryStore::new()), None, None, Some(String::new()));

    let response = app
        .clone()
        .oneshot(post("/api/blog", Some(""), DOCUMENT_PAYLOAD))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(post(
            "/api/blog/webhook",
            Some(""),
            r#"{"event": "entry.delete", "model": "article", "entry": {}}"#,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_upsert_payload_is_a_bad_request() {
    let store = Arc::new(MemoryStore::new());
    let app = app_with(store.clone(), None);

    let response = app
        .oneshot(post(
            "/api/blog",
            Some(PUBLISH_SECRET),
            r#"{"title": "neither shape"}"#,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.get_raw("articles").is_none());
}

#[tokio::test]
async fn malformed_webhook_payload_reports_a_diagnostic() {
    let app = app_with(Arc::new(MemoryStore::new()), None);

    let response = app
        .oneshot(post("/api/blog/webhook", Some(WEBHOOK_SECRET), "not json"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value =
        serde_json::from_slice(&body_bytes(response).await).expect("json diagnostic");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn webhook_ignores_other_models_and_non_removals() {
    let store = Arc::new(MemoryStore::new());
    store.insert_raw(
        "article/keep",
        r#"{"slug": "keep", "frontmatter": {}, "hash": "h"}"#,
    );
    let app = app_with(store.clone(), None);

    let response = app
        .clone()
        .oneshot(post(
            "/api/blog/webhook",
            Some(WEBHOOK_SECRET),
            r#"{"event": "entry.delete", "model": "media", "entry": {"slug": "keep"}}"#,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.get_raw("article/keep").is_some());

    let response = app
        .oneshot(post(
            "/api/blog/webhook",
            Some(WEBHOOK_SECRET),
            r#"{"event": "entry.publish", "model": "article", "entry": {"slug": "keep"}}"#,
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(store.get_raw("article/keep").is_some());
}

#[tokio::test]
async fn cached_reads_skip_the_store() {
    let store = Arc::new(MemoryStore::new());
    store.insert_raw(
        "article/cached",
        r#"{"slug": "cached", "frontmatter": {"title": "C"}, "code": "<p>c</p>", "hash": "h1"}"#,
    );
    let cache = Arc::new(ResponseCache::new(
        NonZeroUsize::new(16).expect("capacity"),
        Duration::from_secs(60),
    ));
    let app = app_with(store.clone(), Some(cache.clone()));

    let response = app
        .clone()
        .oneshot(get("/blog/cached"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    // Population happens off the request path.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!cache.is_empty());

    // A conditional request is a different cache variant, not a stale 200.
    let response = app
        .clone()
        .oneshot(get_conditional("/blog/cached", "h1"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

    // Remove the backing record; the cached response is still replayed.
    store.delete_raw("article/cached");
    let response = app
        .oneshot(get("/blog/cached"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(ETAG).and_then(|v| v.to_str().ok()),
        Some("h1")
    );
}

#[tokio::test]
async fn successful_writes_invalidate_the_cache() {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(ResponseCache::new(
        NonZeroUsize::new(16).expect("capacity"),
        Duration::from_secs(60),
    ));
    let app = app_with(store, Some(cache.clone()));

    let response = app.clone().oneshot(get("/blog")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!cache.is_empty());

    let response = app
        .clone()
        .oneshot(post("/api/blog", Some(PUBLISH_SECRET), DOCUMENT_PAYLOAD))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(cache.is_empty());
}
