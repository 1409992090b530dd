use serde::{Deserialize, Serialize};

/// Configuration for the remote speech recogniser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Subscription key for the recogniser.
    pub subscription_key: String,
    /// Service region (e.g. "westeurope").
    pub region: String,
    /// Recognition locale used when the user has none (e.g. "en-US").
    pub default_language: String,
    /// Hard deadline for a single recognition call, in seconds.
    pub timeout_secs: u64,
    /// How long the recogniser waits for speech to start.
    pub initial_silence_timeout_ms: u64,
    /// Trailing silence that ends an utterance.
    pub end_silence_timeout_ms: u64,
    /// Overrides the regional endpoint (tests, sovereign clouds).
    pub endpoint: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            subscription_key: String::new(),
            region: "westeurope".to_string(),
            default_language: "en-US".to_string(),
            timeout_secs: 15,
            initial_silence_timeout_ms: 60_000,
            end_silence_timeout_ms: 3_000,
            endpoint: None,
        }
    }
}

impl SpeechConfig {
    pub fn is_configured(&self) -> bool {
        !self.subscription_key.is_empty()
    }
}
