//! `OpenAiFlashcardAdapter` against a mocked chat-completions endpoint.

use api_lib::adapters::OpenAiFlashcardAdapter;
use async_openai::{config::OpenAIConfig, Client};
use flashcards_core::ports::{FlashcardGenerationService, ProviderError};
use flashcards_core::{CardPair, GenerationMode};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer, timeout: Duration) -> OpenAiFlashcardAdapter {
    let config = OpenAIConfig::new()
        .with_api_key("test-key")
        .with_api_base(server.uri());
    OpenAiFlashcardAdapter::new(Client::with_config(config), "gpt-3.5-turbo".into(), timeout)
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": "gpt-3.5-turbo",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 20, "total_tokens": 30 }
    })
}

#[tokio::test]
async fn parses_a_fenced_answer_into_pairs() {
    let server = MockServer::start().await;
    let answer = "```json\n[{\"front\": \"Chlorophyll\", \"back\": \"Green pigment\"}, {\"front\": \"Stomata\", \"back\": \"Leaf pores\"}]\n```";
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"model": "gpt-3.5-turbo", "n": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(answer)))
        .expect(1)
        .mount(&server)
        .await;

    let pairs = adapter(&server, Duration::from_secs(5))
        .generate(GenerationMode::Topic, "Photosynthesis")
        .await
        .unwrap();

    assert_eq!(
        pairs,
        vec![
            CardPair::new("Chlorophyll", "Green pigment"),
            CardPair::new("Stomata", "Leaf pores"),
        ]
    );
}

#[tokio::test]
async fn prose_answers_are_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("I cannot help with that.")))
        .mount(&server)
        .await;

    let err = adapter(&server, Duration::from_secs(5))
        .generate(GenerationMode::Text, "Some notes")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Malformed(_)));
}

#[tokio::test]
async fn api_errors_are_transport_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": "Incorrect API key provided",
                "type": "invalid_request_error",
                "param": null,
                "code": "invalid_api_key"
            }
        })))
        .mount(&server)
        .await;

    let err = adapter(&server, Duration::from_secs(5))
        .generate(GenerationMode::Text, "Some notes")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::Transport(_)));
}

#[tokio::test]
async fn slow_answers_time_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("[]"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let timeout = Duration::from_millis(200);
    let err = adapter(&server, timeout)
        .generate(GenerationMode::Text, "Some notes")
        .await
        .unwrap_err();

    assert!(matches!(err, ProviderError::TimedOut(t) if t == timeout));
}
