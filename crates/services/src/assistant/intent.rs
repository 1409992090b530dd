use std::sync::Arc;

use tracing::{debug, warn};

use crate::providers::{ChatMessage, ChatRequest, LanguageModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    ScheduleQuery,
    TrafficQuery,
    RouteQuery,
    AbsenceRequest,
    AdminCommand,
    GeneralQuestion,
}

impl Intent {
    pub const ALL: [Intent; 6] = [
        Intent::ScheduleQuery,
        Intent::TrafficQuery,
        Intent::RouteQuery,
        Intent::AbsenceRequest,
        Intent::AdminCommand,
        Intent::GeneralQuestion,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::ScheduleQuery => "schedule_query",
            Intent::TrafficQuery => "traffic_query",
            Intent::RouteQuery => "route_query",
            Intent::AbsenceRequest => "absence_request",
            Intent::AdminCommand => "admin_command",
            Intent::GeneralQuestion => "general_question",
        }
    }

    pub fn from_label(label: &str) -> Option<Intent> {
        Intent::ALL.into_iter().find(|i| i.as_str() == label)
    }
}

/// Utterances with a fixed label. Also used as the prompt's few-shot examples.
pub const CANONICAL: &[(&str, Intent)] = &[
    ("what's my schedule today", Intent::ScheduleQuery),
    ("when do i work this week", Intent::ScheduleQuery),
    ("show my upcoming shifts", Intent::ScheduleQuery),
    ("how is the traffic to work", Intent::TrafficQuery),
    ("is there traffic on my way", Intent::TrafficQuery),
    ("what's the best route to work", Intent::RouteQuery),
    ("show me alternative routes", Intent::RouteQuery),
    ("i'm sick and can't come in tomorrow", Intent::AbsenceRequest),
    ("i need a day off on friday", Intent::AbsenceRequest),
    ("broadcast plant closed friday", Intent::AdminCommand),
    ("show pending absences", Intent::AdminCommand),
    ("list all users", Intent::AdminCommand),
    ("what is the dress code", Intent::GeneralQuestion),
    ("hello", Intent::GeneralQuestion),
];

/// Lowercases, unifies apostrophes, collapses whitespace and drops trailing punctuation.
pub fn normalize_utterance(text: &str) -> String {
    let lowered = text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
    lowered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['?', '!', '.', ','])
        .to_string()
}

pub fn canonical_intent(utterance: &str) -> Option<Intent> {
    let normalized = normalize_utterance(utterance);
    CANONICAL
        .iter()
        .find(|(example, _)| *example == normalized)
        .map(|(_, intent)| *intent)
}

/// Normalises a model reply (`" Schedule-Query."` becomes `schedule_query`)
/// and validates it against the closed label set.
pub fn parse_label(raw: &str) -> Option<Intent> {
    let cleaned: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    Intent::from_label(cleaned).or_else(|| {
        Intent::ALL
            .into_iter()
            .find(|intent| cleaned.contains(intent.as_str()))
    })
}

fn system_prompt() -> String {
    let labels: Vec<&str> = Intent::ALL.iter().map(|i| i.as_str()).collect();
    let examples: Vec<String> = CANONICAL
        .iter()
        .map(|(u, i)| format!("\"{u}\" -> {}", i.as_str()))
        .collect();
    format!(
        "Classify the employee's message for a shift-scheduling assistant.\n\
         Reply with exactly one label from: {}.\n\
         Examples:\n{}",
        labels.join(", "),
        examples.join("\n")
    )
}

/// Stateless single-utterance classifier.
pub struct IntentClassifier {
    llm: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    pub async fn classify(&self, utterance: &str) -> Intent {
        if let Some(intent) = canonical_intent(utterance) {
            debug!(intent = intent.as_str(), "Canonical utterance");
            return intent;
        }

        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(system_prompt()),
                ChatMessage::user(utterance),
            ],
            temperature: 0.1,
            max_tokens: 16,
        };
        match self.llm.complete(request).await {
            Ok(reply) => parse_label(&reply).unwrap_or_else(|| {
                warn!(reply = %reply, "Unrecognised intent label");
                Intent::GeneralQuestion
            }),
            Err(e) => {
                warn!(error = %e, "Intent classification failed");
                Intent::GeneralQuestion
            }
        }
    }
}
