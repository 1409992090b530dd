//! In-process stand-ins for every remote provider, recording what the
//! application asked of them.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use shiftdesk_db::models::GeoPoint;
use shiftdesk_services::ProviderError;
use shiftdesk_services::providers::{
    ChatRequest, ChatRole, LanguageModel, Mailer, RouteOption, TrafficInfo, TrafficProvider,
    traffic_level,
};
use shiftdesk_services::whatsapp::{TemplateMessage, WhatsAppTransport};
use shiftdesk_speech::{AsrBackend, AsrError, AsrRequest, TranscodeError, Transcoder, TranscriptionResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text { to: String, body: String },
    Template { to: String, message: TemplateMessage },
}

impl Outbound {
    pub fn to(&self) -> &str {
        match self {
            Outbound::Text { to, .. } | Outbound::Template { to, .. } => to,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Outbound::Text { body, .. } => Some(body),
            Outbound::Template { .. } => None,
        }
    }
}

/// WhatsApp transport that records sends and serves media from memory.
#[derive(Default)]
pub struct RecordingWhatsApp {
    sent: Mutex<Vec<Outbound>>,
    media: Mutex<HashMap<String, Vec<u8>>>,
    media_requests: Mutex<Vec<String>>,
}

impl RecordingWhatsApp {
    pub fn sent(&self) -> Vec<Outbound> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, digits: &str) -> Vec<Outbound> {
        self.sent().into_iter().filter(|o| o.to() == digits).collect()
    }

    pub fn put_media(&self, media_id: &str, bytes: Vec<u8>) {
        self.media.lock().unwrap().insert(media_id.to_string(), bytes);
    }

    pub fn media_requests(&self) -> Vec<String> {
        self.media_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl WhatsAppTransport for RecordingWhatsApp {
    async fn send_text(&self, to: &str, body: &str) -> Result<(), ProviderError> {
        self.sent.lock().unwrap().push(Outbound::Text {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn send_template(&self, to: &str, template: &TemplateMessage) -> Result<(), ProviderError> {
        self.sent.lock().unwrap().push(Outbound::Template {
            to: to.to_string(),
            message: template.clone(),
        });
        Ok(())
    }

    async fn media_url(&self, media_id: &str) -> Result<String, ProviderError> {
        self.media_requests.lock().unwrap().push(media_id.to_string());
        Ok(format!("https://media.test/{media_id}"))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ProviderError> {
        let media_id = url.rsplit('/').next().unwrap_or_default();
        self.media
            .lock()
            .unwrap()
            .get(media_id)
            .cloned()
            .ok_or_else(|| ProviderError::Rejected("whatsapp", format!("unknown media {media_id}")))
    }
}

/// Answers classification prompts from substring rules and everything else
/// with a fixed reply.
pub struct ScriptedLlm {
    labels: Mutex<Vec<(String, String)>>,
    answer: Mutex<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl Default for ScriptedLlm {
    fn default() -> Self {
        Self {
            labels: Mutex::new(Vec::new()),
            answer: Mutex::new("Happy to help.".to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedLlm {
    /// Utterances containing `needle` (case-insensitive) classify as `label`.
    pub fn label(&self, needle: &str, label: &str) {
        self.labels
            .lock()
            .unwrap()
            .push((needle.to_lowercase(), label.to_string()));
    }

    pub fn answer_with(&self, answer: &str) {
        *self.answer.lock().unwrap() = answer.to_string();
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn complete(&self, request: ChatRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let classifying = request
            .messages
            .first()
            .is_some_and(|m| m.role == ChatRole::System && m.content.starts_with("Classify"));
        if !classifying {
            return Ok(self.answer.lock().unwrap().clone());
        }
        let utterance = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.to_lowercase())
            .unwrap_or_default();
        let label = self
            .labels
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| utterance.contains(needle.as_str()))
            .map(|(_, label)| label.clone())
            .unwrap_or_else(|| "general_question".to_string());
        Ok(label)
    }
}

/// Passes audio through unchanged.
pub struct PassthroughTranscoder;

impl Transcoder for PassthroughTranscoder {
    fn transcode(&self, input: Vec<u8>) -> Result<Vec<u8>, TranscodeError> {
        Ok(input)
    }
}

/// Recogniser returning a scripted transcript, or `NoSpeech` when none is set.
#[derive(Default)]
pub struct FakeAsr {
    transcript: Mutex<Option<String>>,
    calls: Mutex<usize>,
}

impl FakeAsr {
    pub fn will_hear(&self, text: &str) {
        *self.transcript.lock().unwrap() = Some(text.to_string());
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl AsrBackend for FakeAsr {
    async fn transcribe(&self, _request: AsrRequest) -> Result<TranscriptionResult, AsrError> {
        *self.calls.lock().unwrap() += 1;
        match self.transcript.lock().unwrap().clone() {
            Some(text) => Ok(TranscriptionResult {
                text,
                language: None,
                confidence: Some(0.9),
            }),
            None => Err(AsrError::NoSpeech),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Traffic at a configurable level everywhere.
pub struct FakeMaps {
    level: Mutex<u8>,
}

impl Default for FakeMaps {
    fn default() -> Self {
        Self {
            level: Mutex::new(0),
        }
    }
}

impl FakeMaps {
    pub fn set_level(&self, level: u8) {
        *self.level.lock().unwrap() = level;
    }
}

#[async_trait]
impl TrafficProvider for FakeMaps {
    async fn traffic(&self, _at: GeoPoint) -> Result<TrafficInfo, ProviderError> {
        let level = *self.level.lock().unwrap();
        // Speeds chosen so the shared classifier yields `level`.
        let current_speed = match level {
            0 => 50.0,
            1 => 40.0,
            2 => 30.0,
            3 => 20.0,
            _ => 5.0,
        };
        let level = traffic_level(current_speed, 50.0);
        Ok(TrafficInfo {
            level,
            description: format!("level {level} traffic"),
            current_speed,
            free_flow_speed: 50.0,
            delay_minutes: f64::from(level) * 5.0,
        })
    }

    async fn routes(
        &self,
        _origin: GeoPoint,
        _destination: GeoPoint,
        max_options: usize,
    ) -> Result<Vec<RouteOption>, ProviderError> {
        Ok((0..max_options.min(2))
            .map(|i| RouteOption {
                distance_km: 10.0 + i as f64,
                travel_minutes: 20.0 + 5.0 * i as f64,
                traffic_delay_minutes: 2.0,
            })
            .collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), ProviderError> {
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
