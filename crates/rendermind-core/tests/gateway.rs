//! Generation backends against an in-process HTTP server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use rendermind_core::gateway::{LocalAdapterBackend, RemoteBackend, FALLBACK_MESSAGE};
use rendermind_core::{BackendError, CodeGenerationGateway, SceneSummary, Transcriber};

type Seen = Arc<Mutex<Vec<Value>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn chat(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if auth != "Bearer sk-test" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"error": "bad key"})));
    }
    seen.lock().unwrap().push(body);
    let content = "Here is a cube.\n```rhai\nfn rendermind_action(context) { context.add_cube(); }\n```";
    (
        StatusCode::OK,
        Json(json!({"choices": [{"message": {"role": "assistant", "content": content}}]})),
    )
}

fn remote(endpoint: &str, key: Option<&str>) -> RemoteBackend {
    RemoteBackend::new(
        endpoint,
        key.map(str::to_string),
        "gpt-4o-mini",
        0.7,
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn remote_backend_round_trip() {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/v1/chat/completions", post(chat))
        .with_state(seen.clone());
    let base = serve(app).await;

    let gateway = CodeGenerationGateway::new(Arc::new(remote(&format!("{base}/v1"), Some("sk-test"))));
    let scene = SceneSummary {
        scene: "Scene".into(),
        objects: vec!["Cube".into()],
        active: Some("Cube".into()),
        collections: vec!["Collection".into()],
    };
    let out = gateway.generate("add a cube", Some(&scene)).await.unwrap();
    assert_eq!(out.message, "Here is a cube.");
    assert!(out.fenced);
    assert!(out.code.starts_with("fn rendermind_action"));

    let requests = seen.lock().unwrap();
    let body = &requests[0];
    assert_eq!(body["model"], "gpt-4o-mini");
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "system");
    assert!(messages
        .iter()
        .any(|m| m["content"] == "Create a RenderMind script for: add a cube"));
    assert!(messages
        .iter()
        .any(|m| m["content"].as_str().unwrap_or_default().starts_with("Current scene context:")));
}

#[tokio::test]
async fn remote_backend_status_error() {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/chat/completions", post(chat))
        .with_state(seen);
    let base = serve(app).await;

    let gateway = CodeGenerationGateway::new(Arc::new(remote(&base, Some("wrong"))));
    let err = gateway.generate("cube", None).await.unwrap_err();
    assert!(matches!(err, BackendError::Status { status: 401, .. }));
    assert!(err.to_string().starts_with("API Error 401"));
}

#[tokio::test]
async fn remote_backend_requires_key() {
    let gateway = CodeGenerationGateway::new(Arc::new(remote("http://127.0.0.1:9", None)));
    let err = gateway.generate("cube", None).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "RenderMind API key not set. Please add it in the settings."
    );
}

#[tokio::test]
async fn unfenced_reply_is_used_whole() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async {
            Json(json!({"choices": [{"message": {"content": "fn rendermind_action(context) {}"}}]}))
        }),
    );
    let base = serve(app).await;
    let gateway = CodeGenerationGateway::new(Arc::new(remote(&base, Some("k"))));
    let out = gateway.generate("anything", None).await.unwrap();
    assert!(!out.fenced);
    assert_eq!(out.message, FALLBACK_MESSAGE);
    assert_eq!(out.code, "fn rendermind_action(context) {}");
}

#[tokio::test]
async fn empty_completion_is_an_error() {
    let app = Router::new().route(
        "/chat/completions",
        post(|| async { Json(json!({"choices": []})) }),
    );
    let base = serve(app).await;
    let gateway = CodeGenerationGateway::new(Arc::new(remote(&base, Some("k"))));
    assert_eq!(
        gateway.generate("anything", None).await.unwrap_err(),
        BackendError::EmptyResponse
    );
}

#[tokio::test]
async fn transcription_posts_audio() {
    let app = Router::new().route(
        "/audio/transcriptions",
        post(|| async { Json(json!({"text": "add a red cube"})) }),
    );
    let base = serve(app).await;
    let backend = remote(&base, Some("k"));
    let text = backend.transcribe(vec![0u8; 16]).await.unwrap();
    assert_eq!(text, "add a red cube");
}

#[tokio::test]
async fn local_adapter_contract() {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route(
            "/generate",
            post(|Json(body): Json<Value>| async move {
                let instruction = body["instruction"].as_str().unwrap_or_default().to_string();
                if instruction.contains("delete") {
                    Json(json!({"code": "", "safety_blocked": true, "safety_reason": "destructive"}))
                } else {
                    Json(json!({"code": "fn rendermind_action(context) { context.add_cube(); }"}))
                }
            }),
        );
    let base = serve(app).await;
    let backend = LocalAdapterBackend::new(&base, Duration::from_secs(5)).unwrap();
    assert!(backend.is_healthy().await);

    let gateway = CodeGenerationGateway::new(Arc::new(backend));
    let out = gateway.generate("add a cube", None).await.unwrap();
    assert!(out.code.contains("add_cube"));

    let err = gateway.generate("delete everything", None).await.unwrap_err();
    assert!(matches!(err, BackendError::SafetyBlocked(_)));
}
