use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{AsrBackend, AsrError, AsrRequest, TranscriptionResult};
use crate::config::SpeechConfig;

/// Azure Speech short-audio REST backend.
pub struct AzureSpeechBackend {
    client: Client,
    config: SpeechConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecognitionResponse {
    recognition_status: String,
    display_text: Option<String>,
    #[serde(default, rename = "NBest")]
    n_best: Vec<NBestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NBestEntry {
    confidence: Option<f64>,
}

impl AzureSpeechBackend {
    pub fn new(config: SpeechConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        match &self.config.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1",
                self.config.region
            ),
        }
    }
}

#[async_trait]
impl AsrBackend for AzureSpeechBackend {
    async fn transcribe(&self, request: AsrRequest) -> Result<TranscriptionResult, AsrError> {
        if !self.config.is_configured() {
            return Err(AsrError::Unavailable("speech key not configured".to_string()));
        }

        let response = self
            .client
            .post(self.endpoint())
            .query(&[
                ("language", request.language.as_str()),
                ("format", "detailed"),
            ])
            .query(&[
                ("initialSilenceTimeoutMs", self.config.initial_silence_timeout_ms),
                ("endSilenceTimeoutMs", self.config.end_silence_timeout_ms),
            ])
            .header("Ocp-Apim-Subscription-Key", &self.config.subscription_key)
            .header(
                "Content-Type",
                "audio/wav; codecs=audio/pcm; samplerate=16000",
            )
            .header("Accept", "application/json")
            .body(request.wav)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AsrError::Timeout
                } else {
                    AsrError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(AsrError::Unavailable(format!("{}: {}", status, body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AsrError::Rejected(format!("{}: {}", status, body)));
        }

        let body: RecognitionResponse = response
            .json()
            .await
            .map_err(|e| AsrError::Rejected(format!("Unreadable response: {}", e)))?;

        interpret(body, &request.language)
    }

    fn name(&self) -> &str {
        "azure_speech"
    }
}

fn interpret(body: RecognitionResponse, language: &str) -> Result<TranscriptionResult, AsrError> {
    match body.recognition_status.as_str() {
        "Success" => {
            let text = body.display_text.unwrap_or_default().trim().to_string();
            if text.is_empty() {
                return Err(AsrError::NoSpeech);
            }
            debug!(chars = text.len(), "Speech recognised");
            Ok(TranscriptionResult {
                text,
                language: Some(language.to_string()),
                confidence: body.n_best.first().and_then(|n| n.confidence),
            })
        }
        "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => Err(AsrError::NoSpeech),
        other => {
            warn!(status = other, "Recogniser returned an error status");
            Err(AsrError::Unavailable(other.to_string()))
        }
    }
}
