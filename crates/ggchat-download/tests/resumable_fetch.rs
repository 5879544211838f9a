//! Fetcher behavior against a local HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use axum::extract::{Path as UrlPath, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use ggchat_core::{FetchError, ModelFetcherPort};
use ggchat_download::{FetcherConfig, HttpModelFetcher};
use tempfile::TempDir;

const PAYLOAD_LEN: usize = 64 * 1024;

#[derive(Clone)]
struct Server {
    payload: Arc<Vec<u8>>,
    /// Respond 503 to this many requests before serving.
    failures_left: Arc<AtomicUsize>,
    honor_ranges: bool,
    requests: Arc<Mutex<Vec<HeaderMap>>>,
}

impl Server {
    fn new() -> Self {
        Self {
            payload: Arc::new((0..PAYLOAD_LEN).map(|i| (i % 251) as u8).collect()),
            failures_left: Arc::new(AtomicUsize::new(0)),
            honor_ranges: true,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn requests(&self) -> Vec<HeaderMap> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve_file(
    State(server): State<Server>,
    UrlPath(file): UrlPath<String>,
    headers: HeaderMap,
) -> Response {
    server.requests.lock().unwrap().push(headers.clone());

    if file != "model.gguf" {
        return StatusCode::NOT_FOUND.into_response();
    }
    if server
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
    {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }

    let range_start = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
        .and_then(|v| v.trim_end_matches('-').parse::<usize>().ok());

    match range_start {
        Some(start) if server.honor_ranges => {
            if start >= server.payload.len() {
                return StatusCode::RANGE_NOT_SATISFIABLE.into_response();
            }
            let body = server.payload[start..].to_vec();
            let range = format!("bytes {start}-{}/{}", PAYLOAD_LEN - 1, PAYLOAD_LEN);
            (
                StatusCode::PARTIAL_CONTENT,
                [(header::CONTENT_RANGE, range)],
                body,
            )
                .into_response()
        }
        _ => (StatusCode::OK, server.payload.to_vec()).into_response(),
    }
}

async fn spawn(server: Server) -> SocketAddr {
    let app = Router::new()
        .route("/owner/repo/resolve/main/{file}", get(serve_file))
        .with_state(server);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn fetcher(addr: SocketAddr) -> HttpModelFetcher {
    let config = FetcherConfig::new()
        .with_resolve_url(format!("http://{addr}"))
        .with_optional_token(Some("hf_secret".into()))
        .with_max_retries(3)
        .with_retry_delay(Duration::from_millis(10));
    HttpModelFetcher::new(&config).unwrap()
}

#[tokio::test]
async fn downloads_into_place_and_removes_partial() {
    let server = Server::new();
    let addr = spawn(server.clone()).await;
    let dir = TempDir::new().unwrap();

    let path = fetcher(addr)
        .fetch_file("owner/repo", "model.gguf", dir.path())
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("model.gguf"));
    assert_eq!(std::fs::read(&path).unwrap(), *server.payload);
    assert!(!dir.path().join("model.gguf.part").exists());

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].get(header::AUTHORIZATION).unwrap(),
        "Bearer hf_secret"
    );
}

#[tokio::test]
async fn resumes_from_existing_partial_file() {
    let server = Server::new();
    let addr = spawn(server.clone()).await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("model.gguf.part"), &server.payload[..1000]).unwrap();

    let path = fetcher(addr)
        .fetch_file("owner/repo", "model.gguf", dir.path())
        .await
        .unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), *server.payload);
    let requests = server.requests();
    assert_eq!(requests[0].get(header::RANGE).unwrap(), "bytes=1000-");
}

#[tokio::test]
async fn restarts_when_server_ignores_ranges() {
    let mut server = Server::new();
    server.honor_ranges = false;
    let addr = spawn(server.clone()).await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("model.gguf.part"), b"stale bytes").unwrap();

    let path = fetcher(addr)
        .fetch_file("owner/repo", "model.gguf", dir.path())
        .await
        .unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), *server.payload);
}

#[tokio::test]
async fn retries_transient_server_errors() {
    let server = Server::new();
    server.failures_left.store(2, Ordering::SeqCst);
    let addr = spawn(server.clone()).await;
    let dir = TempDir::new().unwrap();

    let path = fetcher(addr)
        .fetch_file("owner/repo", "model.gguf", dir.path())
        .await
        .unwrap();

    assert!(path.exists());
    assert_eq!(server.requests().len(), 3);
}

#[tokio::test]
async fn gives_up_after_retry_budget() {
    let server = Server::new();
    server.failures_left.store(10, Ordering::SeqCst);
    let addr = spawn(server.clone()).await;
    let dir = TempDir::new().unwrap();

    let err = fetcher(addr)
        .fetch_file("owner/repo", "model.gguf", dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(_)));
    assert_eq!(server.requests().len(), 4);
    assert!(!dir.path().join("model.gguf").exists());
}

#[tokio::test]
async fn missing_file_is_not_retried() {
    let server = Server::new();
    let addr = spawn(server.clone()).await;
    let dir = TempDir::new().unwrap();

    let err = fetcher(addr)
        .fetch_file("owner/repo", "absent.gguf", dir.path())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::NotFound(_)));
    assert_eq!(server.requests().len(), 1);
}
