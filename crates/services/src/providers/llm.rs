use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shiftdesk_config::LlmSettings;
use tracing::debug;

use super::{http_client, with_deadline};
use crate::error::ProviderError;

const PROVIDER: &str = "llm";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the assistant's reply text.
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Azure OpenAI chat-completions deployment.
pub struct AzureOpenAiClient {
    client: reqwest::Client,
    settings: LlmSettings,
}

impl AzureOpenAiClient {
    pub fn new(settings: LlmSettings) -> Self {
        Self {
            client: http_client(settings.timeout_secs),
            settings,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.settings.endpoint.trim_end_matches('/'),
            self.settings.deployment
        )
    }

    async fn call(&self, request: &ChatRequest) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.url())
            .query(&[("api-version", self.settings.api_version.as_str())])
            .header("api-key", &self.settings.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(PROVIDER, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_client_error() {
                ProviderError::Rejected(PROVIDER, format!("{status}: {body}"))
            } else {
                ProviderError::Unavailable(PROVIDER, format!("{status}: {body}"))
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(PROVIDER, e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| ProviderError::Unavailable(PROVIDER, "empty completion".to_string()))
    }
}

#[async_trait]
impl LanguageModel for AzureOpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError> {
        if self.settings.endpoint.is_empty() || self.settings.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(PROVIDER));
        }
        debug!(
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "Requesting chat completion"
        );
        with_deadline(PROVIDER, self.settings.timeout_secs, self.call(&request)).await
    }
}
