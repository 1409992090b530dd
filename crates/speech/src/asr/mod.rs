pub mod azure;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use azure::AzureSpeechBackend;

/// Request to transcribe one voice note.
pub struct AsrRequest {
    /// 16 kHz mono 16-bit PCM WAV.
    pub wav: Vec<u8>,
    /// Recognition locale (e.g. "en-US", "fr-FR").
    pub language: String,
}

/// Result of a transcription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub language: Option<String>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Error)]
pub enum AsrError {
    #[error("No speech recognised")]
    NoSpeech,
    #[error("Recogniser timed out")]
    Timeout,
    #[error("Recogniser rejected the request: {0}")]
    Rejected(String),
    #[error("Recogniser unavailable: {0}")]
    Unavailable(String),
}

impl AsrError {
    /// Whether the call is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, AsrError::Timeout | AsrError::Unavailable(_))
    }
}

/// Pluggable speech-to-text backend.
#[async_trait]
pub trait AsrBackend: Send + Sync + 'static {
    async fn transcribe(&self, request: AsrRequest) -> Result<TranscriptionResult, AsrError>;

    /// Human-readable backend name.
    fn name(&self) -> &str;
}
