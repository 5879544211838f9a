//! Engine and readiness behavior against a stand-in llama-server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use ggchat_core::{CompletionRequest, EngineError, InferenceEngine};
use ggchat_runtime::{LlamaServerEngine, RuntimeError, wait_for_http_health};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct FakeServer {
    /// `/health` answers 503 this many times before 200.
    loading_polls: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
    fail_completions: bool,
}

async fn health(State(server): State<FakeServer>) -> Response {
    if server
        .loading_polls
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
    {
        return (StatusCode::SERVICE_UNAVAILABLE, "loading model").into_response();
    }
    Json(json!({"status": "ok"})).into_response()
}

async fn completion(State(server): State<FakeServer>, Json(body): Json<Value>) -> Response {
    server.bodies.lock().unwrap().push(body);
    if server.fail_completions {
        return (StatusCode::INTERNAL_SERVER_ERROR, "context overflow").into_response();
    }
    Json(json!({
        "content": " The capital of France is Paris.",
        "tokens_predicted": 8,
        "tokens_evaluated": 30,
        "stop": true
    }))
    .into_response()
}

async fn spawn(server: FakeServer) -> SocketAddr {
    let app = Router::new()
        .route("/health", get(health))
        .route("/completion", post(completion))
        .with_state(server);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn request() -> CompletionRequest {
    CompletionRequest {
        prompt: "### System: be brief\n### Dialog History:\nUser: Capital of France?\nAssistant:"
            .into(),
        max_tokens: 128,
        temperature: 0.7,
        top_p: 0.9,
        stop: vec!["###".into(), "\nUser:".into()],
        repeat_penalty: 1.2,
    }
}

#[tokio::test]
async fn generate_posts_sampling_parameters() {
    let server = FakeServer::default();
    let addr = spawn(server.clone()).await;
    let mut engine = LlamaServerEngine::new(reqwest::Client::new(), format!("http://{addr}"), None);

    let completion = engine.generate(&request()).await.unwrap();
    assert_eq!(completion.text, " The capital of France is Paris.");
    let usage = completion.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 30);
    assert_eq!(usage.completion_tokens, 8);

    let body = server.bodies.lock().unwrap()[0].clone();
    assert_eq!(body["n_predict"], 128);
    assert!((body["repeat_penalty"].as_f64().unwrap() - 1.2).abs() < 1e-6);
    assert_eq!(body["stop"], json!(["###", "\nUser:"]));
}

#[tokio::test]
async fn server_errors_surface_as_generation_failures() {
    let server = FakeServer {
        fail_completions: true,
        ..FakeServer::default()
    };
    let addr = spawn(server).await;
    let mut engine = LlamaServerEngine::new(reqwest::Client::new(), format!("http://{addr}"), None);

    let err = engine.generate(&request()).await.unwrap_err();
    let EngineError::Generate(message) = err else {
        panic!("expected a generation error, got {err:?}");
    };
    assert!(message.contains("500") && message.contains("context overflow"));
}

#[tokio::test]
async fn release_without_child_is_a_no_op() {
    let mut engine = LlamaServerEngine::new(reqwest::Client::new(), "http://127.0.0.1:9", None);
    engine.release().await.unwrap();
    engine.release().await.unwrap();
}

#[tokio::test]
#[cfg(unix)]
async fn exited_child_reports_engine_dead() {
    let server = FakeServer::default();
    let addr = spawn(server.clone()).await;
    let child = tokio::process::Command::new("true").spawn().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut engine =
        LlamaServerEngine::new(reqwest::Client::new(), format!("http://{addr}"), Some(child));
    assert!(!engine.is_alive());

    let err = engine.generate(&request()).await.unwrap_err();
    assert!(matches!(err, EngineError::Dead(_)), "got {err:?}");
    assert!(server.bodies.lock().unwrap().is_empty());
    engine.release().await.unwrap();
}

#[tokio::test]
async fn readiness_waits_out_model_loading() {
    let server = FakeServer::default();
    server.loading_polls.store(3, Ordering::SeqCst);
    let addr = spawn(server.clone()).await;

    wait_for_http_health(
        &reqwest::Client::new(),
        &format!("http://{addr}"),
        None,
        Duration::from_secs(10),
        Duration::from_millis(20),
    )
    .await
    .unwrap();
    assert_eq!(server.loading_polls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn readiness_times_out() {
    let server = FakeServer::default();
    server.loading_polls.store(usize::MAX, Ordering::SeqCst);
    let addr = spawn(server).await;

    let err = wait_for_http_health(
        &reqwest::Client::new(),
        &format!("http://{addr}"),
        None,
        Duration::from_millis(200),
        Duration::from_millis(20),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RuntimeError::StartupTimeout { .. }));
}
