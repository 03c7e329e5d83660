use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use clap::Parser;
use linko_cache::MemoryCacheStore;
use linko_core::{CacheStore, NewUrlRecord, Repository, ShortCode, UrlRecord};
use linko_gateway::server::Runtime;
use linko_gateway::{App, Config};
use linko_storage::InMemoryRepository;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

struct TestApp {
    config: Config,
    runtime: Runtime,
    repository: Arc<InMemoryRepository>,
}

impl TestApp {
    fn new() -> Self {
        let config = Config::try_parse_from(["linko", "--base-url", "http://lin.ko"]).unwrap();
        let repository = Arc::new(InMemoryRepository::new());
        let runtime = Runtime::start(
            &config,
            Arc::new(MemoryCacheStore::new()),
            Arc::clone(&repository),
        )
        .unwrap();
        Self {
            config,
            runtime,
            repository,
        }
    }

    fn router(&self) -> Router {
        App::router(self.runtime.state.clone())
    }

    async fn shorten(&self, body: &str) -> (StatusCode, Value) {
        let request = Request::post("/shorten")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(self.router(), request).await
    }

    async fn get(&self, uri: &str) -> axum::response::Response {
        self.router()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Stops the pipelines so every queued write and hit update has run.
    async fn settle(self) -> Arc<InMemoryRepository> {
        self.runtime.stop(&self.config).await;
        self.repository
    }
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn shorten_then_redirect_counts_one_hit() {
    let app = TestApp::new();

    let (status, body) = app.shorten(r#"{"url":"https://example.com/a"}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], false);

    let code = body["data"]["code"].as_str().unwrap().to_string();
    assert!((7..=8).contains(&code.len()));
    assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(body["data"]["short_url"], format!("http://lin.ko/{code}"));

    let response = app.get(&format!("/{code}")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers()[header::LOCATION],
        "https://example.com/a"
    );

    let repository = app.settle().await;
    let record = repository
        .lookup(&ShortCode::new_unchecked(code))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.original_url, "https://example.com/a");
    assert_eq!(record.hit_count, 1);
}

#[tokio::test]
async fn missing_url_is_bad_request() {
    let app = TestApp::new();

    let (status, body) = app.shorten("{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
    assert_eq!(body["message"], "url is required");

    let (status, _) = app.shorten(r#"{"url":""}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_url_is_bad_request() {
    let app = TestApp::new();

    let (status, body) = app.shorten(r#"{"url":"not a url"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);

    let (status, body) = app.shorten(r#"{"url":"ftp://example.com"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "url scheme must be http or https: ftp");
}

#[tokio::test]
async fn control_characters_in_url_are_bad_request() {
    let app = TestApp::new();

    for body in [
        r#"{"url":"https://example.com/a\nb"}"#,
        r#"{"url":"https://example.com/a\rb"}"#,
        r#"{"url":"https://example.com/a\u0001b"}"#,
    ] {
        let (status, response) = app.shorten(body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response["message"], "invalid control character in URL");
    }

    let repository = app.settle().await;
    assert!(repository.is_empty());
}

#[tokio::test]
async fn unencodable_stored_url_is_internal_error() {
    let config = Config::try_parse_from(["linko"]).unwrap();
    let cache = Arc::new(MemoryCacheStore::new());
    cache
        .hash_set(
            "lk:url:abcdefg",
            &[("url", "https://example.com/a\nb"), ("persisted", "1")],
            Duration::from_secs(60),
        )
        .await
        .unwrap();
    let runtime = Runtime::start(&config, cache, Arc::new(InMemoryRepository::new())).unwrap();

    let response = App::router(runtime.state.clone())
        .oneshot(Request::get("/abcdefg").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(header::LOCATION).is_none());
    assert_eq!(json(response).await["message"], "internal server error");

    runtime.stop(&config).await;
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = TestApp::new();

    let (status, body) = app.shorten("{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], true);
}

/// Counts every call that reaches the cache.
#[derive(Default)]
struct CountingCache {
    inner: MemoryCacheStore,
    calls: AtomicUsize,
}

#[async_trait]
impl CacheStore for CountingCache {
    async fn get(&self, key: &str) -> linko_core::cache::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> linko_core::cache::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value, ttl).await
    }

    async fn hash_set(
        &self,
        key: &str,
        fields: &[(&str, &str)],
        ttl: Duration,
    ) -> linko_core::cache::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.hash_set(key, fields, ttl).await
    }

    async fn hash_get(&self, key: &str, field: &str) -> linko_core::cache::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.hash_get(key, field).await
    }

    async fn increment(&self, key: &str) -> linko_core::cache::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.increment(key).await
    }
}

/// Counts every call that reaches the durable store.
#[derive(Default)]
struct CountingRepository {
    inner: InMemoryRepository,
    calls: AtomicUsize,
}

#[async_trait]
impl Repository for CountingRepository {
    async fn insert(&self, record: &NewUrlRecord) -> linko_core::repository::Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(record).await
    }

    async fn lookup(&self, code: &ShortCode) -> linko_core::repository::Result<Option<UrlRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.lookup(code).await
    }

    async fn increment_hit_count(&self, code: &ShortCode) -> linko_core::repository::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.increment_hit_count(code).await
    }
}

#[tokio::test]
async fn malformed_codes_are_rejected_without_store_calls() {
    let config = Config::try_parse_from(["linko"]).unwrap();
    let cache = Arc::new(CountingCache::default());
    let repository = Arc::new(CountingRepository::default());
    let runtime =
        Runtime::start(&config, Arc::clone(&cache), Arc::clone(&repository)).unwrap();
    let router = App::router(runtime.state.clone());

    for uri in [
        "/abc",
        "/abcdefghij",
        "/abc-123",
        "/stats/abc",
        "/stats/abcdefghij",
        "/stats/abc-123",
    ] {
        let response = router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json(response).await["error"], true);
    }

    runtime.stop(&config).await;
    assert_eq!(cache.calls.load(Ordering::SeqCst), 0);
    assert_eq!(repository.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unknown_code_is_not_found() {
    let app = TestApp::new();

    let response = app.get("/abcdefg").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(response).await["message"], "no result found");

    let response = app.get("/stats/abcdefg").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stats_report_the_durable_row() {
    let app = TestApp::new();

    let (_, body) = app.shorten(r#"{"url":"https://example.com/stats"}"#).await;
    let code = body["data"]["code"].as_str().unwrap().to_string();

    let repository = app.settle().await;
    assert!(repository
        .lookup(&ShortCode::new_unchecked(code.clone()))
        .await
        .unwrap()
        .is_some());

    // The write-behind row now exists; a fresh runtime over the same store
    // serves its stats.
    let config = Config::try_parse_from(["linko"]).unwrap();
    let runtime =
        Runtime::start(&config, Arc::new(MemoryCacheStore::new()), repository).unwrap();
    let response = App::router(runtime.state.clone())
        .oneshot(
            Request::get(format!("/stats/{code}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json(response).await;
    assert_eq!(body["error"], false);
    assert_eq!(body["data"]["code"], code);
    assert_eq!(body["data"]["count"], 0);
    assert_eq!(body["data"]["original_url"], "https://example.com/stats");
    assert!(body["data"]["created_at"].is_string());

    runtime.stop(&config).await;
}

#[tokio::test]
async fn health_and_index() {
    let app = TestApp::new();

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["status"], "ok");

    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["error"], false);
}

#[tokio::test]
async fn ping_answers_a_dot() {
    let app = TestApp::new();

    let response = app.get("/ping").await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b".");
}

#[tokio::test]
async fn cors_preflight_echoes_web_origins() {
    let app = TestApp::new();

    let preflight = |origin: &'static str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/shorten")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,x-csrf-token")
            .body(Body::empty())
            .unwrap()
    };

    let response = app.router().oneshot(preflight("https://app.example")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example");
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "300");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
    assert!(methods.contains("POST") && methods.contains("DELETE"), "{methods}");

    let response = app.router().oneshot(preflight("chrome-extension://abc")).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn cors_headers_on_simple_requests() {
    let app = TestApp::new();

    let response = app
        .router()
        .oneshot(
            Request::get("/")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_EXPOSE_HEADERS], "link");
}
