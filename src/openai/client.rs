use std::error::Error as StdError;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::core::{ChatRequest, ChatResponse, Message};
use crate::core::AppConfig;

/// Everything that can go wrong during a single turn. The `Display`
/// output is what gets shown to the user, so keep it readable.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Error creating request payload: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Error making API request: {}", error_chain(.0))]
    Transport(#[source] reqwest::Error),

    #[error("API request timed out after {0:?}")]
    Timeout(Duration),

    #[error("API request cancelled")]
    Cancelled,

    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Error reading response body: {}", error_chain(.0))]
    ReadBody(#[source] reqwest::Error),

    #[error("Error parsing response JSON: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("No response from the assistant.")]
    NoChoices,
}

// reqwest's own message only says which URL failed. The underlying
// cause (refused connection, DNS failure, reset) is further down the
// source chain.
fn error_chain(err: &dyn StdError) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_msg = cause.to_string();
        if !msg.ends_with(&cause_msg) {
            msg.push_str(": ");
            msg.push_str(&cause_msg);
        }
        source = cause.source();
    }
    msg
}

/// Client for an Azure OpenAI style chat completions deployment.
#[derive(Clone)]
pub struct CompletionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    api_version: String,
    timeout: Option<Duration>,
}

impl CompletionClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_version: config.api_version.clone(),
            timeout: config.request_timeout,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches("/"),
            self.model,
            self.api_version
        )
    }

    /// Sends the full transcript and returns the first reply. Returns
    /// `CompletionError::Cancelled` without touching the network if
    /// `cancel` fires first.
    pub async fn complete(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Result<Message, CompletionError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CompletionError::Cancelled),
            result = self.send(messages) => result,
        }
    }

    async fn send(&self, messages: &[Message]) -> Result<Message, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
        };
        let payload = serde_json::to_vec(&request).map_err(CompletionError::Encode)?;

        let url = self.url();
        tracing::debug!(%url, messages = messages.len(), "Sending chat completion request");

        let mut builder = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header("api-key", &self.api_key)
            .body(payload);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.classify(e, CompletionError::Transport))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify(e, CompletionError::ReadBody))?;

        if status != StatusCode::OK {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .inspect_err(|e| tracing::debug!("Parsing completion failed for {}\nError: {}", body, e))
            .map_err(CompletionError::Decode)?;

        parsed.into_reply().ok_or(CompletionError::NoChoices)
    }

    fn classify(
        &self,
        err: reqwest::Error,
        otherwise: fn(reqwest::Error) -> CompletionError,
    ) -> CompletionError {
        match self.timeout {
            Some(timeout) if err.is_timeout() => CompletionError::Timeout(timeout),
            _ => otherwise(err),
        }
    }
}
