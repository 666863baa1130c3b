use slidesmith_ai::OpenAiProvider;
use slidesmith_core::provider::CompletionRequest;
use slidesmith_core::{AiProvider, ApiKey, PromptPair, ProviderConfig, SlidesmithError};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> OpenAiProvider {
    let config = ProviderConfig::new("gpt-4o")
        .with_base_url(format!("{}/v1/chat/completions", server.uri()))
        .with_timeout(5);
    OpenAiProvider::new(config).unwrap()
}

fn request(key: &str) -> CompletionRequest {
    CompletionRequest {
        prompt: PromptPair {
            system: "exactly 3 slides".to_string(),
            user: "Intro to cats".to_string(),
        },
        api_key: ApiKey::new(key),
    }
}

fn completion(content: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

#[tokio::test]
async fn sends_both_messages_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-form"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "system", "content": "exactly 3 slides"},
                {"role": "user", "content": "Intro to cats"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("```python\nprint('hi')\n```".into())))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider(&server).complete(request("sk-form")).await.unwrap();
    assert_eq!(response.text, "print('hi')");
    assert_eq!(response.tokens_used, Some(15));
}

#[tokio::test]
async fn error_status_becomes_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Incorrect API key provided"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(request("sk-bad")).await.unwrap_err();
    match err {
        SlidesmithError::ProviderError(msg) => assert!(msg.contains("Incorrect API key provided")),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn server_error_keeps_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(request("sk-form")).await.unwrap_err();
    assert!(matches!(err, SlidesmithError::ProviderError(ref m) if m.contains("500")));
}

#[tokio::test]
async fn empty_content_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(serde_json::Value::Null)))
        .mount(&server)
        .await;

    let err = provider(&server).complete(request("sk-form")).await.unwrap_err();
    assert!(matches!(err, SlidesmithError::EmptyResponse));
}

#[tokio::test]
async fn unreachable_endpoint_is_network_error() {
    let server = MockServer::start().await;
    let provider = provider(&server);
    drop(server);

    let err = provider.complete(request("sk-form")).await.unwrap_err();
    assert!(matches!(err, SlidesmithError::NetworkError(_)));
}
