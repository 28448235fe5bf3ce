//! Tests of [`ResponsesClient`] against a local stand-in for the proxy.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use barista_chat::error::ProxyError;
use barista_chat::llm::{CompletionClient, ResponsesClient};
use barista_chat::session::ConversationState;
use serde_json::{Value, json};

/// What the upstream saw, and what it answers with.
#[derive(Clone, Default)]
struct Upstream {
    requests: Arc<Mutex<Vec<(HeaderMap, Value)>>>,
    status: u16,
    body: String,
}

async fn handle(State(up): State<Upstream>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    up.requests.lock().unwrap().push((headers, body));
    let status = StatusCode::from_u16(up.status).unwrap();
    (status, [("content-type", "application/json")], up.body.clone()).into_response()
}

/// Spawn the upstream and return its endpoint URL.
async fn spawn_upstream(up: Upstream) -> String {
    let app = Router::new().route("/api/OpenAIProxy", post(handle)).with_state(up);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/api/OpenAIProxy")
}

fn upstream(status: u16, body: Value) -> Upstream {
    Upstream {
        requests: Arc::default(),
        status,
        body: body.to_string(),
    }
}

fn client() -> ResponsesClient {
    ResponsesClient::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn sends_bearer_json_and_threads_continuation() {
    let up = upstream(
        200,
        json!({"id": "resp_2", "output": [{"content": [{"type": "output_text", "text": "<p>Steam the milk</p>"}]}]}),
    );
    let endpoint = spawn_upstream(up.clone()).await;
    let mut state = ConversationState::new(&endpoint, "gpt-4o-mini", "Be a barista.", "sk-test");

    let first = client().request_completion("Flat white?", &state).await.unwrap();
    assert_eq!(first.reply_html, "<p>Steam the milk</p>");
    assert_eq!(first.continuation_id, "resp_2");
    // The client never mutates the state it was handed.
    assert_eq!(state.continuation(), None);

    state.advance(first.continuation_id);
    client().request_completion("And a cortado?", &state).await.unwrap();

    let requests = up.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);

    let (headers, body) = &requests[0];
    assert_eq!(headers["authorization"], "Bearer sk-test");
    assert!(
        headers["content-type"]
            .to_str()
            .unwrap()
            .starts_with("application/json")
    );
    assert_eq!(
        body,
        &json!({"model": "gpt-4o-mini", "input": "Flat white?", "instructions": "Be a barista."})
    );

    assert_eq!(requests[1].1["previous_response_id"], "resp_2");
    assert_eq!(requests[1].1["input"], "And a cortado?");
}

#[tokio::test]
async fn non_success_status_is_network_error() {
    for status in [401, 429, 500, 502] {
        let endpoint = spawn_upstream(upstream(status, json!({"error": "nope"}))).await;
        let state = ConversationState::new(&endpoint, "m", "i", "k");

        let err = client().request_completion("latte", &state).await.unwrap_err();
        assert!(matches!(err, ProxyError::Network { status: s } if s == status));
    }
}

#[tokio::test]
async fn malformed_success_body_is_protocol_error() {
    for body in [
        json!({"output": [{"content": [{"text": "no id"}]}]}),
        json!({"id": "r", "output": []}),
        json!({"id": "r", "output": [{"content": [{"type": "refusal"}]}]}),
        json!("just a string"),
    ] {
        let endpoint = spawn_upstream(upstream(200, body.clone())).await;
        let state = ConversationState::new(&endpoint, "m", "i", "k");

        let err = client().request_completion("latte", &state).await.unwrap_err();
        assert!(matches!(err, ProxyError::Protocol(_)), "body {body}");
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let state = ConversationState::new(format!("http://{addr}/api"), "m", "i", "k");
    let err = client().request_completion("latte", &state).await.unwrap_err();
    assert!(matches!(err, ProxyError::Transport(_)));
    assert_eq!(err.status(), None);
}
