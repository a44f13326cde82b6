use super::ollama::{OllamaBackend, OllamaConfig};
use super::{LlmBackend, LlmError};
use futures_util::TryStreamExt;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend_for(server: &MockServer) -> OllamaBackend {
    OllamaBackend::new(OllamaConfig {
        model: "test-model".to_string(),
        base_url: server.uri(),
        temperature: None,
    })
    .unwrap()
}

#[tokio::test]
async fn chat_sends_user_message_and_returns_content() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": false,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "Hi there!"},
            "done": true,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let reply = backend.chat("Hello", None).await.unwrap();

    assert_eq!(reply, "Hi there!");
}

#[tokio::test]
async fn chat_places_system_prompt_before_user_prompt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "messages": [
                {"role": "system", "content": "Be terse"},
                {"role": "user", "content": "Hello"},
            ],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "Hi."},
            "done": true,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let reply = backend.chat("Hello", Some("Be terse")).await.unwrap();

    assert_eq!(reply, "Hi.");
}

#[tokio::test]
async fn chat_maps_http_error_status_to_server_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model exploded"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let result = backend.chat("Hello", None).await;

    match result {
        Err(LlmError::Server { status, message }) => {
            assert_eq!(status, 500);
            assert!(message.contains("model exploded"));
        }
        other => panic!("expected server error, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn chat_stream_yields_ndjson_fragments_in_order() {
    let server = MockServer::start().await;

    let body = concat!(
        r#"{"message":{"role":"assistant","content":"He"},"done":false}"#,
        "\n",
        r#"{"message":{"role":"assistant","content":"llo"},"done":false}"#,
        "\n",
        r#"{"message":{"role":"assistant","content":""},"done":true}"#,
        "\n",
    );

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "application/x-ndjson"),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let stream = backend.chat_stream("Hello", None).await.unwrap();
    let fragments: Vec<String> = stream.try_collect().await.unwrap();

    assert_eq!(fragments, vec!["He", "llo"]);
}

#[tokio::test]
async fn chat_stream_surfaces_error_status_before_any_chunks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .mount(&server)
        .await;

    let backend = backend_for(&server);
    let result = backend.chat_stream("Hello", None).await;

    assert!(matches!(result, Err(LlmError::Server { status: 404, .. })));
}
