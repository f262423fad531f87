use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use smala::config::LlmConfig;
use smala::error::LlmError;
use smala::llm::http::HttpLanguageModel;
use smala::llm::{LanguageModel, Message};

#[derive(Clone, Default)]
struct Backend {
    requests: Arc<Mutex<Vec<Value>>>,
}

async fn chat(State(backend): State<Backend>, Json(body): Json<Value>) -> (StatusCode, String) {
    let streaming = body["stream"].as_bool().unwrap_or(false);
    let last = body["messages"]
        .as_array()
        .and_then(|m| m.last())
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string();
    backend.requests.lock().unwrap().push(body);

    match (last.as_str(), streaming) {
        ("fail", _) => (StatusCode::INTERNAL_SERVER_ERROR, "model crashed".into()),
        ("garbage", false) => (StatusCode::OK, "this is not json".into()),
        ("empty object", false) => (StatusCode::OK, "{}".into()),
        (_, false) => (
            StatusCode::OK,
            json!({"message": {"role": "assistant", "content": format!("echo: {last}")}, "done": true})
                .to_string(),
        ),
        (_, true) => {
            let lines = [
                json!({"message": {"content": "Hel"}, "done": false}).to_string(),
                "{ broken fragment".to_string(),
                json!({"message": {"content": "lo"}, "done": false}).to_string(),
                json!({"message": {"content": ""}, "done": true}).to_string(),
                json!({"message": {"content": "after done"}, "done": false}).to_string(),
            ];
            (StatusCode::OK, lines.join("\n") + "\n")
        }
    }
}

async fn spawn_backend() -> (SocketAddr, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/api/chat", post(chat))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, backend)
}

fn client_for(addr: SocketAddr) -> HttpLanguageModel {
    let config = LlmConfig {
        api_url: format!("http://{addr}/api/chat"),
        model: "test-model".into(),
        system_message: "default system".into(),
        request_timeout_secs: 5,
        ..LlmConfig::default()
    };
    HttpLanguageModel::new(&config).unwrap()
}

#[tokio::test]
async fn non_streaming_reply_is_returned() {
    let (addr, backend) = spawn_backend().await;
    let llm = client_for(addr);

    let reply = llm.generate(&[Message::user("ping")], None).await;
    assert_eq!(reply.as_deref(), Some("echo: ping"));

    let requests = backend.requests.lock().unwrap();
    let body = &requests[0];
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["system_message"], "default system");
    assert_eq!(body["stream"], false);
    assert_eq!(body["messages"][0], json!({"role": "user", "content": "ping"}));
}

#[tokio::test]
async fn per_call_system_message_overrides_default() {
    let (addr, backend) = spawn_backend().await;
    let llm = client_for(addr);

    llm.generate(&[Message::user("x")], Some("summarize this")).await;
    assert_eq!(backend.requests.lock().unwrap()[0]["system_message"], "summarize this");
}

#[tokio::test]
async fn server_error_becomes_none() {
    let (addr, _) = spawn_backend().await;
    let llm = client_for(addr);

    assert!(llm.generate(&[Message::user("fail")], None).await.is_none());
    let err = llm.try_generate(&[Message::user("fail")], None).await.unwrap_err();
    assert!(matches!(err, LlmError::Status(s) if s.as_u16() == 500), "got {err:?}");
}

#[tokio::test]
async fn malformed_body_becomes_none() {
    let (addr, _) = spawn_backend().await;
    let llm = client_for(addr);

    assert!(llm.generate(&[Message::user("garbage")], None).await.is_none());
    let err = llm.try_generate(&[Message::user("garbage")], None).await.unwrap_err();
    assert!(matches!(err, LlmError::MalformedBody(_)), "got {err:?}");

    let err = llm.try_generate(&[Message::user("empty object")], None).await.unwrap_err();
    assert!(matches!(err, LlmError::MissingContent), "got {err:?}");
}

#[tokio::test]
async fn unreachable_backend_becomes_none() {
    // bind to learn a free port, then close it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let llm = client_for(addr);
    assert!(llm.generate(&[Message::user("hello")], None).await.is_none());

    let mut fragments = Vec::new();
    let mut sink = |f: &str| fragments.push(f.to_string());
    assert!(llm.generate_streaming(&[Message::user("hello")], &mut sink).await.is_none());
    assert!(fragments.is_empty());
}

#[tokio::test]
async fn streaming_assembles_fragments_and_skips_bad_lines() {
    let (addr, backend) = spawn_backend().await;
    let llm = client_for(addr);

    let mut fragments = Vec::new();
    let mut sink = |f: &str| fragments.push(f.to_string());
    let reply = llm.generate_streaming(&[Message::user("stream please")], &mut sink).await;

    assert_eq!(reply.as_deref(), Some("Hello"));
    assert_eq!(fragments, vec!["Hel", "lo"]);

    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests[0]["stream"], true);
    assert_eq!(requests[0]["system_message"], "default system");
}

#[tokio::test]
async fn streaming_server_error_becomes_none() {
    let (addr, _) = spawn_backend().await;
    let llm = client_for(addr);

    let mut sink = |_: &str| {};
    assert!(llm.generate_streaming(&[Message::user("fail")], &mut sink).await.is_none());
}
