use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use shiftdesk_speech::{
    AsrBackend, AsrError, AsrRequest, MIN_AUDIO_BYTES, SpeechConfig, TranscodeError, Transcoder,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ServiceError};
use crate::whatsapp::WhatsAppTransport;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media fetch failed: {0}")]
    MediaFetch(String),
    #[error("Transcoding failed: {0}")]
    Transcode(String),
    #[error("No speech recognised")]
    NoSpeech,
    #[error("Speech pipeline timed out")]
    Timeout,
    #[error("Invalid audio: {0}")]
    Validation(String),
    #[error("Recogniser failed: {0}")]
    Recogniser(String),
}

impl From<MediaError> for ServiceError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::NoSpeech => ServiceError::NoSpeech,
            MediaError::Timeout => ServiceError::ProviderTimeout(e.to_string()),
            MediaError::Validation(msg) => ServiceError::Validation(msg),
            MediaError::Transcode(msg) => ServiceError::TranscodeFailed(msg),
            MediaError::MediaFetch(msg) | MediaError::Recogniser(msg) => {
                ServiceError::DependencyUnavailable(msg)
            }
        }
    }
}

/// Maps a stored language preference to a recogniser locale.
pub fn recognition_locale(preferred: &str, default_locale: &str) -> String {
    let trimmed = preferred.trim();
    if trimmed.contains('-') {
        return trimmed.to_string();
    }
    match trimmed.to_lowercase().as_str() {
        "en" => "en-US".to_string(),
        "fr" => "fr-FR".to_string(),
        "es" => "es-ES".to_string(),
        "de" => "de-DE".to_string(),
        _ if default_locale.is_empty() => "en-US".to_string(),
        _ => default_locale.to_string(),
    }
}

enum Attempt<T> {
    Done(T),
    Retry(MediaError),
    Fail(MediaError),
}

/// Resolves provider media, transcodes it to 16 kHz mono WAV and runs speech-to-text.
pub struct MediaDecoder {
    transport: Arc<dyn WhatsAppTransport>,
    transcoder: Arc<dyn Transcoder>,
    asr: Arc<dyn AsrBackend>,
    transcode_deadline: Duration,
    asr_deadline: Duration,
    max_retries: u32,
    base_backoff: Duration,
}

impl MediaDecoder {
    pub fn new(
        transport: Arc<dyn WhatsAppTransport>,
        transcoder: Arc<dyn Transcoder>,
        asr: Arc<dyn AsrBackend>,
        config: &SpeechConfig,
    ) -> Self {
        Self {
            transport,
            transcoder,
            asr,
            transcode_deadline: Duration::from_secs(15),
            asr_deadline: Duration::from_secs(config.timeout_secs),
            max_retries: 2,
            base_backoff: Duration::from_secs(1),
        }
    }

    /// Overrides the first retry delay (doubles on each further retry).
    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.base_backoff = base;
        self
    }

    pub async fn transcribe(&self, media_id: &str, locale: &str) -> Result<String, MediaError> {
        let url = self
            .transport
            .media_url(media_id)
            .await
            .map_err(fetch_error)?;
        let audio = self.transport.download(&url).await.map_err(fetch_error)?;
        debug!(media_id, bytes = audio.len(), "Downloaded voice note");

        if audio.len() < MIN_AUDIO_BYTES {
            return Err(MediaError::Validation(format!(
                "audio buffer of {} bytes is below the {MIN_AUDIO_BYTES} byte minimum",
                audio.len()
            )));
        }

        let wav = self
            .with_retries("transcode", || self.transcode_once(audio.clone()))
            .await?;
        let text = self
            .with_retries("speech-to-text", || self.recognise_once(wav.clone(), locale))
            .await?;

        info!(media_id, chars = text.len(), "Voice note transcribed");
        Ok(text)
    }

    async fn transcode_once(&self, audio: Vec<u8>) -> Attempt<Vec<u8>> {
        let transcoder = self.transcoder.clone();
        let job = tokio::task::spawn_blocking(move || transcoder.transcode(audio));
        match tokio::time::timeout(self.transcode_deadline, job).await {
            Err(_) => Attempt::Retry(MediaError::Timeout),
            Ok(Err(join)) => Attempt::Fail(MediaError::Transcode(join.to_string())),
            Ok(Ok(Ok(wav))) => Attempt::Done(wav),
            Ok(Ok(Err(e))) => classify_transcode(e),
        }
    }

    async fn recognise_once(&self, wav: Vec<u8>, locale: &str) -> Attempt<String> {
        let request = AsrRequest {
            wav,
            language: locale.to_string(),
        };
        match tokio::time::timeout(self.asr_deadline, self.asr.transcribe(request)).await {
            Err(_) => Attempt::Retry(MediaError::Timeout),
            Ok(Ok(result)) if result.text.trim().is_empty() => Attempt::Fail(MediaError::NoSpeech),
            Ok(Ok(result)) => Attempt::Done(result.text.trim().to_string()),
            Ok(Err(e)) => classify_asr(e),
        }
    }

    async fn with_retries<T, F, Fut>(&self, stage: &'static str, mut run: F) -> Result<T, MediaError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Attempt<T>>,
    {
        let mut attempt = 0;
        loop {
            match run().await {
                Attempt::Done(value) => return Ok(value),
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(e) if attempt >= self.max_retries => return Err(e),
                Attempt::Retry(e) => {
                    let delay = self.base_backoff * 2u32.pow(attempt);
                    warn!(stage, attempt, error = %e, ?delay, "Transient speech failure, retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn fetch_error(e: ProviderError) -> MediaError {
    match e {
        ProviderError::Timeout(_) => MediaError::Timeout,
        other => MediaError::MediaFetch(other.to_string()),
    }
}

fn classify_transcode<T>(e: TranscodeError) -> Attempt<T> {
    match e {
        TranscodeError::TooSmall(n) => Attempt::Fail(MediaError::Validation(format!("{n} bytes"))),
        e if e.is_transient() => Attempt::Retry(MediaError::Transcode(e.to_string())),
        e => Attempt::Fail(MediaError::Transcode(e.to_string())),
    }
}

fn classify_asr<T>(e: AsrError) -> Attempt<T> {
    match e {
        AsrError::NoSpeech => Attempt::Fail(MediaError::NoSpeech),
        AsrError::Timeout => Attempt::Retry(MediaError::Timeout),
        e if e.is_transient() => Attempt::Retry(MediaError::Recogniser(e.to_string())),
        e => Attempt::Fail(MediaError::Recogniser(e.to_string())),
    }
}
