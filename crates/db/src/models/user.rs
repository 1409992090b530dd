use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub team_id: Option<ObjectId>,
    pub position: Option<String>,
    pub department: Option<String>,
    #[serde(default)]
    pub notification_preferences: NotificationPrefs,
    pub default_location_id: Option<ObjectId>,
    #[serde(default = "default_language")]
    pub preferred_language: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Employee => "employee",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPrefs {
    #[serde(default = "bool_true")]
    pub email: bool,
    #[serde(default = "bool_true")]
    pub whatsapp: bool,
    #[serde(default)]
    pub daily_briefing: bool,
    #[serde(default = "default_briefing_time")]
    pub briefing_time: String,
}

impl Default for NotificationPrefs {
    fn default() -> Self {
        Self {
            email: true,
            whatsapp: true,
            daily_briefing: false,
            briefing_time: default_briefing_time(),
        }
    }
}

fn bool_true() -> bool {
    true
}

fn default_briefing_time() -> String {
    "07:00".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

impl User {
    pub const COLLECTION: &'static str = "users";

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Phone reduced to its digits, or `None` when no phone is on file.
    pub fn phone_digits(&self) -> Option<String> {
        self.phone
            .as_deref()
            .map(digits_only)
            .filter(|d| !d.is_empty())
    }
}

/// Strips everything but ASCII digits, so `+1 555-0100` and `15550100` compare equal.
pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// E.164-style storage form: `+` followed by the digits, `None` when no digits remain.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits = digits_only(raw);
    (!digits.is_empty()).then(|| format!("+{digits}"))
}
