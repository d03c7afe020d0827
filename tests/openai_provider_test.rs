// OpenAI-compatible provider against a mock server

use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

use mender::providers::{collect_stream, CompletionProvider, OpenAIProvider, ProviderError, RetryPolicy};

fn provider(url: String, key: Option<&str>) -> OpenAIProvider {
    OpenAIProvider::new_compatible(url, key.map(str::to_string), "local-coder", Duration::from_secs(5))
        .unwrap()
        .with_retry_policy(RetryPolicy::none())
}

#[tokio::test]
async fn test_complete_sends_bearer_and_reads_choice() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({"model": "local-coder"})))
        .with_status(200)
        .with_body(
            json!({
                "choices": [{"message": {"role": "assistant", "content": "```python\nprint(1)\n```"}}]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let text = provider(server.url(), Some("sk-test")).complete("Fix").await.unwrap();
    assert_eq!(text, "```python\nprint(1)\n```");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_no_key_sends_no_authorization() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(json!({"choices": [{"message": {"content": "ok"}}]}).to_string())
        .create_async()
        .await;

    provider(server.url(), None).complete("Fix").await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_choices_is_empty_response() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(json!({"choices": []}).to_string())
        .create_async()
        .await;

    let err = provider(server.url(), None).complete("Fix").await.unwrap_err();
    assert!(matches!(err, ProviderError::EmptyResponse { .. }));
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(401)
        .with_body(r#"{"error":{"message":"bad key"}}"#)
        .expect(1)
        .create_async()
        .await;

    let provider = provider(server.url(), Some("sk-bad")).with_retry_policy(RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
    });
    let err = provider.complete("Fix").await.unwrap_err();

    assert!(!err.is_transient());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_stream_parses_sse_until_done() {
    let body = format!(
        "data: {}\n\ndata: {}\n\ndata: [DONE]\n\n",
        json!({"choices": [{"delta": {"content": "print("}}]}),
        json!({"choices": [{"delta": {"content": "2)"}}]}),
    );

    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let rx = provider(server.url(), None).complete_stream("Fix").await.unwrap();
    let text = collect_stream(rx, |_| {}).await.unwrap();
    assert_eq!(text, "print(2)");
}

#[tokio::test]
async fn test_stream_without_content_is_empty_response() {
    let body = format!(
        "data: {}\n\ndata: [DONE]\n\n",
        json!({"choices": [{"delta": {"role": "assistant"}}]}),
    );

    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let rx = provider(server.url(), None).complete_stream("Fix").await.unwrap();
    let result = collect_stream(rx, |_| {}).await;
    assert!(matches!(result, Err(ProviderError::EmptyResponse { .. })));
}

#[tokio::test]
async fn test_check_available_lists_models() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/models")
        .with_status(200)
        .with_body(json!({"data": [{"id": "local-coder"}, {"id": "other"}]}).to_string())
        .create_async()
        .await;

    assert!(provider(server.url(), None).check_available().await.unwrap());
}
