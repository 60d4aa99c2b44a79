//! OpenAI-compatible adapter against a mocked HTTP endpoint.

use felos_domain::config::{AuthConfig, LlmConfig};
use felos_domain::error::Error;
use felos_domain::stream::StreamEvent;
use felos_domain::tool::Message;
use felos_providers::{ChatRequest, LlmProvider, OpenAiCompatProvider};
use futures_util::StreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> OpenAiCompatProvider {
    let cfg = LlmConfig {
        base_url: server.uri(),
        auth: AuthConfig::bearer_from_env("FELOS_TEST_UNUSED"),
        chat_model: "test-model".into(),
        ..LlmConfig::default()
    };
    OpenAiCompatProvider::from_config(&cfg, "test-key").unwrap()
}

fn sse(chunks: &[serde_json::Value]) -> String {
    let mut body: String = chunks
        .iter()
        .map(|c| format!("data: {c}\n\n"))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn chat_sends_model_and_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "test-model", "stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "test-model",
            "choices": [{"message": {"content": "[]"}, "finish_reason": "stop"}]
        })))
        .mount(&server)
        .await;

    let resp = provider(&server)
        .chat(ChatRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(resp.content, "[]");
    assert_eq!(resp.model, "test-model");
}

#[tokio::test]
async fn stream_yields_tokens_fragments_and_done() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({"choices":[{"delta":{"content":"Let me "}}]}),
        json!({"choices":[{"delta":{"content":"check."}}]}),
        json!({"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"scrapeProduct","arguments":"{\"url\":"}}]}}]}),
        json!({"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"\"https://x.test\"}"}}]}}]}),
        json!({"choices":[{"delta":{},"finish_reason":"tool_calls"}]}),
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let mut stream = provider(&server)
        .chat_stream(ChatRequest {
            messages: vec![Message::user("scrape https://x.test")],
            ..Default::default()
        })
        .await
        .unwrap();

    let mut text = String::new();
    let mut args = String::new();
    let mut done = 0;
    while let Some(event) = stream.next().await {
        match event.unwrap() {
            StreamEvent::Token { text: t } => text.push_str(&t),
            StreamEvent::ToolCallFragment { index, arguments, .. } => {
                assert_eq!(index, 0);
                args.push_str(&arguments);
            }
            StreamEvent::Done { .. } => done += 1,
            StreamEvent::Error { message } => panic!("unexpected error: {message}"),
        }
    }
    assert_eq!(text, "Let me check.");
    assert_eq!(args, "{\"url\":\"https://x.test\"}");
    assert_eq!(done, 1);
}

#[tokio::test]
async fn http_error_maps_to_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let err = match provider(&server).chat_stream(ChatRequest::default()).await {
        Ok(_) => panic!("expected an error"),
        Err(e) => e,
    };
    match err {
        Error::Provider { message, .. } => assert!(message.contains("401")),
        other => panic!("unexpected error: {other}"),
    }
}
