use std::collections::BTreeMap;

use bson::DateTime;
use serde::{Deserialize, Serialize};

/// Singleton document (`_id = "global"`) driving the WhatsApp channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppSettings {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "bool_true")]
    pub auto_reply: bool,
    #[serde(default = "bool_true")]
    pub ai_processing: bool,
    #[serde(default = "default_max_response_length")]
    pub max_response_length: u32,
    #[serde(default)]
    pub welcome_message: String,
    #[serde(default)]
    pub system_instructions: String,
    #[serde(default)]
    pub templates: BTreeMap<String, TemplateDefinition>,
    #[serde(default)]
    pub legacy_templates: BTreeMap<String, String>,
    pub updated_at: DateTime,
}

/// A provider-approved message shape. `body` uses positional placeholders
/// `{{1}}`, `{{2}}`, ... filled from `parameters` in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateDefinition {
    pub body: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub languages: BTreeMap<String, TemplateVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemplateVariant {
    /// Template name registered with the provider.
    pub template_id: String,
    /// Provider language code, e.g. `en_US`.
    pub code: String,
    /// Localised body; the definition's body is used when absent.
    pub body: Option<String>,
}

fn bool_true() -> bool {
    true
}

fn default_max_response_length() -> u32 {
    1000
}

impl WhatsAppSettings {
    pub const COLLECTION: &'static str = "whatsapp_settings";
    pub const GLOBAL_ID: &'static str = "global";
}

impl Default for WhatsAppSettings {
    fn default() -> Self {
        Self {
            id: Self::GLOBAL_ID.to_string(),
            enabled: true,
            auto_reply: true,
            ai_processing: true,
            max_response_length: default_max_response_length(),
            welcome_message: "Welcome to Shiftdesk! Ask me about your schedule, traffic, routes, \
                              or send an absence request. Text and voice notes both work."
                .to_string(),
            system_instructions: "You are the Shiftdesk assistant for shift workers. \
                                  Answer questions about work schedules, commuting and absences."
                .to_string(),
            templates: default_templates(),
            legacy_templates: default_legacy_templates(),
            updated_at: DateTime::now(),
        }
    }
}

fn variant(template_id: &str, code: &str, body: Option<&str>) -> TemplateVariant {
    TemplateVariant {
        template_id: template_id.to_string(),
        code: code.to_string(),
        body: body.map(str::to_string),
    }
}

fn definition(
    name: &str,
    body: &str,
    parameters: &[&str],
    fr_body: &str,
) -> (String, TemplateDefinition) {
    let mut languages = BTreeMap::new();
    languages.insert("en".to_string(), variant(name, "en_US", None));
    languages.insert(
        "fr".to_string(),
        variant(&format!("{name}_fr"), "fr", Some(fr_body)),
    );
    (
        name.to_string(),
        TemplateDefinition {
            body: body.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            languages,
        },
    )
}

/// Built-in registry seeded when the settings document is first created.
pub fn default_templates() -> BTreeMap<String, TemplateDefinition> {
    [
        definition(
            "schedule_reminder",
            "Hi {{1}}, you are scheduled for {{2}} on {{3}} from {{4}} at {{5}}.",
            &["name", "title", "date", "start_time", "location"],
            "Bonjour {{1}}, vous êtes planifié pour {{2}} le {{3}} à partir de {{4}} à {{5}}.",
        ),
        definition(
            "welcome_message",
            "Welcome to Shiftdesk, {{1}}! Reply here to check your schedule, traffic and absences.",
            &["name"],
            "Bienvenue sur Shiftdesk, {{1}} ! Répondez ici pour consulter votre planning, le trafic et vos absences.",
        ),
        definition(
            "schedule_change",
            "Hi {{1}}, your shift {{2}} on {{3}} was updated. It now starts at {{4}} at {{5}}.",
            &["name", "title", "date", "start_time", "location"],
            "Bonjour {{1}}, votre service {{2}} du {{3}} a été modifié. Il commence maintenant à {{4}} à {{5}}.",
        ),
        definition(
            "general_announcement_update",
            "Hi {{1}}, announcement: {{2}}",
            &["name", "message"],
            "Bonjour {{1}}, annonce : {{2}}",
        ),
        definition(
            "absence_update",
            "Hi {{1}}, your absence request from {{3}} to {{4}} was {{2}}.",
            &["name", "status", "start_date", "end_date"],
            "Bonjour {{1}}, votre demande d'absence du {{3}} au {{4}} a été {{2}}.",
        ),
        definition(
            "traffic_alert",
            "Hi {{1}}, {{3}} traffic near {{5}} before {{2}}. Expect about {{4}} extra minutes.",
            &["name", "title", "level", "delay_minutes", "location"],
            "Bonjour {{1}}, trafic {{3}} près de {{5}} avant {{2}}. Prévoyez environ {{4}} minutes de plus.",
        ),
    ]
    .into_iter()
    .collect()
}

/// Plain-text fallbacks keyed by the same logical names. Placeholders are
/// slot names in braces, e.g. `{title}`.
pub fn default_legacy_templates() -> BTreeMap<String, String> {
    [
        (
            "schedule_reminder",
            "Reminder: {title} on {date} at {start_time}, {location}.",
        ),
        ("welcome_message", "Welcome to Shiftdesk, {name}!"),
        (
            "schedule_change",
            "Shift update: {title} on {date} now starts at {start_time}, {location}.",
        ),
        ("general_announcement_update", "Announcement: {message}"),
        (
            "absence_update",
            "Your absence request ({start_date} to {end_date}) was {status}.",
        ),
        (
            "traffic_alert",
            "Traffic alert for {title}: {level} traffic, about {delay_minutes} min delay.",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}
