use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub jwt: JwtSettings,
    pub mail: MailSettings,
    pub whatsapp: WhatsAppSettings,
    pub speech: SpeechSettings,
    pub llm: LlmSettings,
    pub maps: MapsSettings,
    pub assistant: AssistantSettings,
    pub notifications: NotificationSettings,
    pub traffic_alerts: TrafficAlertSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    /// "development" or "production".
    pub mode: String,
    /// IANA zone used for "today" and calendar days.
    pub timezone: String,
    pub cors_origins: Vec<String>,
}

impl AppSettings {
    pub fn is_production(&self) -> bool {
        self.mode.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub token_ttl_secs: u64,
    pub issuer: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WhatsAppSettings {
    pub access_token: String,
    pub phone_number_id: String,
    pub verify_token: String,
    /// Enables `X-Hub-Signature-256` verification when set.
    pub app_secret: Option<String>,
    pub api_version: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SpeechSettings {
    pub subscription_key: String,
    pub region: String,
    pub default_language: String,
    pub timeout_secs: u64,
    pub initial_silence_timeout_ms: u64,
    pub end_silence_timeout_ms: u64,
    pub endpoint: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmSettings {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MapsSettings {
    pub subscription_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantSettings {
    /// Prior turns handed to the LLM for general questions (capped at 10).
    pub history_turns: usize,
    pub max_route_options: usize,
    pub unknown_user_reply: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationSettings {
    pub max_concurrency: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrafficAlertSettings {
    pub enabled: bool,
    pub cron: String,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("SHIFTDESK"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 5000)?
            .set_default("app.mode", "development")?
            .set_default("app.timezone", "UTC")?
            .set_default("app.cors_origins", Vec::<String>::new())?
            .set_default("database.url", "mongodb://localhost:27019")?
            .set_default("database.name", "shiftdesk")?
            .set_default("jwt.secret", "")?
            .set_default("jwt.token_ttl_secs", 86400)?
            .set_default("jwt.issuer", "shiftdesk")?
            .set_default("mail.host", "")?
            .set_default("mail.port", 587)?
            .set_default("mail.username", "")?
            .set_default("mail.password", "")?
            .set_default("mail.from", "")?
            .set_default("mail.timeout_secs", 10)?
            .set_default("whatsapp.access_token", "")?
            .set_default("whatsapp.phone_number_id", "")?
            .set_default("whatsapp.verify_token", "")?
            .set_default("whatsapp.app_secret", None::<String>)?
            .set_default("whatsapp.api_version", "v21.0")?
            .set_default("whatsapp.base_url", "https://graph.facebook.com")?
            .set_default("whatsapp.timeout_secs", 10)?
            .set_default("speech.subscription_key", "")?
            .set_default("speech.region", "westeurope")?
            .set_default("speech.default_language", "en-US")?
            .set_default("speech.timeout_secs", 15)?
            .set_default("speech.initial_silence_timeout_ms", 60000)?
            .set_default("speech.end_silence_timeout_ms", 3000)?
            .set_default("speech.endpoint", None::<String>)?
            .set_default("llm.endpoint", "")?
            .set_default("llm.api_key", "")?
            .set_default("llm.deployment", "")?
            .set_default("llm.api_version", "2024-06-01")?
            .set_default("llm.timeout_secs", 30)?
            .set_default("maps.subscription_key", "")?
            .set_default("maps.base_url", "https://atlas.microsoft.com")?
            .set_default("maps.timeout_secs", 10)?
            .set_default("assistant.history_turns", 10)?
            .set_default("assistant.max_route_options", 3)?
            .set_default(
                "assistant.unknown_user_reply",
                "Sorry, this number is not registered with your employer's scheduling system. Please contact your administrator.",
            )?
            .set_default("notifications.max_concurrency", 8)?
            .set_default("traffic_alerts.enabled", true)?
            .set_default("traffic_alerts.cron", "0 */30 * * * *")?
            .build()?;

        config.try_deserialize()
    }

    /// Secrets that must be present before serving production traffic.
    pub fn missing_secrets(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.jwt.secret.is_empty() {
            missing.push("jwt.secret");
        }
        if self.whatsapp.verify_token.is_empty() {
            missing.push("whatsapp.verify_token");
        }
        if self.whatsapp.access_token.is_empty() {
            missing.push("whatsapp.access_token");
        }
        if self.whatsapp.phone_number_id.is_empty() {
            missing.push("whatsapp.phone_number_id");
        }
        missing
    }
}
