//! Router tests against stub shorteners. No network access.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use nestly_server::routes;
use nestly_server::shortener::{ShortenError, Shortener};
use nestly_server::state::AppState;

const LINK: &str = "https://nestly.test/#grocery:eJyrVipRslLyTczJUaoFAA";

#[derive(Default)]
struct StubShortener {
    fail: bool,
    calls: AtomicUsize,
}

#[async_trait]
impl Shortener for StubShortener {
    async fn shorten(&self, long_url: &str) -> Result<String, ShortenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ShortenError::Status { status: 503 });
        }
        Ok(format!("https://short.test/{}", long_url.len()))
    }
}

async fn get(stub: Arc<StubShortener>, uri: &str) -> (StatusCode, Value) {
    let app = routes::router(Arc::new(AppState { shortener: stub }));
    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn shorten_uri(url: &str) -> String {
    format!("/api/shorten?url={}", urlencoding::encode(url))
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = get(Arc::default(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn shorten_returns_short_url() {
    let stub = Arc::new(StubShortener::default());
    let (status, body) = get(stub.clone(), &shorten_uri(LINK)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shortUrl"], format!("https://short.test/{}", LINK.len()));
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_url_is_bad_request() {
    let stub = Arc::new(StubShortener::default());
    let (status, body) = get(stub.clone(), "/api/shorten").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "URL is required");

    let (status, _) = get(stub.clone(), "/api/shorten?url=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_nestly_urls_are_refused() {
    let stub = Arc::new(StubShortener::default());
    for url in [
        "https://example.com/",
        "https://example.com/#https:evil",
        "grocery:abc",
        "ftp://nestly.test/#grocery:abc",
    ] {
        let (status, body) = get(stub.clone(), &shorten_uri(url)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{url}");
        assert_eq!(body["error"], "URL is not a Nestly link");
    }
    assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn upstream_failure_is_server_error() {
    let stub = Arc::new(StubShortener {
        fail: true,
        ..StubShortener::default()
    });
    let (status, body) = get(stub, &shorten_uri(LINK)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Failed to shorten link");
}
