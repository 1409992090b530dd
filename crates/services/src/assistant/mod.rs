//! WhatsApp conversational assistant: intent classification, per-intent
//! handlers, the admin command interpreter and the inbound pipeline.

pub mod admin;
pub mod agent;
pub mod dates;
pub mod handlers;
pub mod intent;

use std::collections::BTreeMap;
use std::sync::Arc;

use shiftdesk_config::AssistantSettings;

use crate::absence_workflow::AbsenceWorkflow;
use crate::notify::Dispatcher;
use crate::providers::{LanguageModel, TrafficProvider};
use crate::stores::Stores;
use crate::time::LocalClock;
use crate::whatsapp::{OutboundPolicy, TemplateRegistry};

pub use agent::WhatsAppAgent;
pub use intent::{Intent, IntentClassifier};

/// Collaborators every handler may query.
pub struct AssistantDeps {
    pub stores: Stores,
    pub clock: LocalClock,
    pub llm: Arc<dyn LanguageModel>,
    pub maps: Arc<dyn TrafficProvider>,
    pub dispatcher: Arc<Dispatcher>,
    pub absences: Arc<AbsenceWorkflow>,
    pub policy: Arc<OutboundPolicy>,
    pub registry: Arc<TemplateRegistry>,
    pub settings: AssistantSettings,
}

/// Handler output: the response text plus context slots to overwrite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub text: String,
    pub context: BTreeMap<String, serde_json::Value>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_slot(mut self, slot: &str, value: serde_json::Value) -> Self {
        self.context.insert(slot.to_string(), value);
        self
    }
}

/// Cuts `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
