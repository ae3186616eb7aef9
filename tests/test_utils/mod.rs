//! Test utilities for integration tests
use std::io::Cursor;
use std::time::Duration;

use azchat::chat::{BufReadSource, ChatSession, FailurePolicy, Transcript};
use azchat::core::AppConfig;
use mockito::{Matcher, Mock, ServerGuard};

/// Config pointing at a mock server with a short timeout so a broken
/// test fails fast instead of hanging.
pub fn test_config(endpoint: &str) -> AppConfig {
    AppConfig {
        endpoint: endpoint.to_string(),
        api_key: "test-key".to_string(),
        model: "gpt-4".to_string(),
        api_version: "2023-06-01-preview".to_string(),
        system_message: "You are a helpful assistant.".to_string(),
        request_timeout: Some(Duration::from_secs(5)),
        failure_policy: FailurePolicy::KeepUserMessage,
    }
}

/// Mocks the completions endpoint to reply with `content`, expecting
/// exactly `hits` requests.
pub async fn mock_reply(server: &mut ServerGuard, content: &str, hits: usize) -> Mock {
    let body = serde_json::json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    });
    server
        .mock(
            "POST",
            Matcher::Regex(r"^/openai/deployments/gpt-4/chat/completions".to_string()),
        )
        .match_header("api-key", "test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(hits)
        .create_async()
        .await
}

/// Runs a whole session over scripted input and returns everything
/// printed along with the final transcript.
pub async fn run_script(config: &AppConfig, script: &str) -> (String, Transcript) {
    let session = ChatSession::from_config(config);
    let mut source = BufReadSource::new(Cursor::new(script.to_string()));
    let mut out = Vec::new();

    let transcript = session
        .run(Transcript::new(&config.system_message), &mut source, &mut out)
        .await
        .expect("Chat session failed");

    (String::from_utf8(out).expect("Output was not UTF-8"), transcript)
}
