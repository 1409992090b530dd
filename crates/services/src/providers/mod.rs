//! Remote capabilities the agent depends on. Each one is a trait with a
//! single HTTP/SMTP implementation, swapped for fakes in tests.

pub mod llm;
pub mod mail;
pub mod maps;

use std::future::Future;
use std::time::Duration;

use crate::error::ProviderError;

pub use llm::{AzureOpenAiClient, ChatMessage, ChatRequest, ChatRole, LanguageModel};
pub use mail::{Mailer, SmtpMailer};
pub use maps::{AzureMapsClient, RouteOption, TrafficInfo, TrafficProvider, traffic_level};

/// Runs `call` under a hard deadline, mapping expiry to `ProviderError::Timeout`.
pub async fn with_deadline<T, F>(
    provider: &'static str,
    secs: u64,
    call: F,
) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::time::timeout(Duration::from_secs(secs), call)
        .await
        .map_err(|_| ProviderError::Timeout(provider))?
}

pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}
