use std::time::Duration;

use super::error::TransportError;
use crate::message::Message;

/// Body of a chat-completion request.
#[derive(Debug, serde::Serialize)]
pub struct ChatRequest<'a> {
    /// Model id.
    pub model: &'a str,
    /// Ordered conversation.
    pub messages: &'a [Message],
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion length cap.
    pub max_tokens: u32,
}

/// Something that can answer a chat-completion request.
///
/// Implementations make exactly one attempt; the gateway never retries.
pub trait ChatTransport {
    /// Send `request` and return the first choice's message content.
    fn send(&self, request: &ChatRequest<'_>) -> Result<String, TransportError>;
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Connection settings for [`OpenAiTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// API root, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token.
    pub api_key: String,
    /// Sent as `OpenAI-Project` when set.
    pub project_id: Option<String>,
    /// Sent as `OpenAI-Organization` when set.
    pub organization: Option<String>,
    /// Whole-request timeout.
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout.
    pub connect_timeout: Duration,
}

/// `OpenAI`-compatible `/chat/completions` client.
pub struct OpenAiTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl OpenAiTransport {
    /// Build the HTTP client with the configured timeouts.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    async fn send_async(&self, request: &ChatRequest<'_>) -> Result<String, TransportError> {
        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(request);
        if let Some(project) = &self.config.project_id {
            builder = builder.header("OpenAI-Project", project);
        }
        if let Some(org) = &self.config.organization {
            builder = builder.header("OpenAI-Organization", org);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_body(status.as_u16(), resp.text().await);
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        parse_completion(&body)
    }
}

impl ChatTransport for OpenAiTransport {
    fn send(&self, request: &ChatRequest<'_>) -> Result<String, TransportError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::Runtime(e.to_string()))?;
        rt.block_on(self.send_async(request))
    }
}

/// Body of a failed response, or a note saying why it could not be read.
fn error_body<E: std::fmt::Display>(status: u16, read: Result<String, E>) -> String {
    read.unwrap_or_else(|e| {
        tracing::warn!(status, error = %e, "could not read error response body");
        format!("<unreadable body: {e}>")
    })
}

/// Extract the first choice's content, trimmed.
fn parse_completion(body: &str) -> Result<String, TransportError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| TransportError::Parse(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .ok_or(TransportError::EmptyResponse)
}
