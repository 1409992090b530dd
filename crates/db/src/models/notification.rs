use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub channel: NotificationChannel,
    pub recipient_id: ObjectId,
    pub subject: String,
    pub content: String,
    pub relation: Relation,
    pub related_id: Option<ObjectId>,
    #[serde(default)]
    pub status: NotificationStatus,
    pub sent_at: Option<DateTime>,
    pub delivered_at: Option<DateTime>,
    pub read_at: Option<DateTime>,
    pub failed_at: Option<DateTime>,
    #[serde(default)]
    pub deliveries: Vec<DeliveryResult>,
    pub error: Option<String>,
    pub created_by: Option<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Whatsapp,
    #[default]
    Both,
}

impl NotificationChannel {
    pub fn allows_email(&self) -> bool {
        matches!(self, NotificationChannel::Email | NotificationChannel::Both)
    }

    pub fn allows_whatsapp(&self) -> bool {
        matches!(self, NotificationChannel::Whatsapp | NotificationChannel::Both)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Relation {
    Schedule,
    Absence,
    Announcement,
    Traffic,
    DailyBriefing,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Pending,
    Sent,
    Failed,
    Delivered,
    Read,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::Read => "read",
        }
    }

    /// Statuses from which a notification may step forward to `self`.
    pub fn predecessors(&self) -> &'static [NotificationStatus] {
        use NotificationStatus::*;
        match self {
            Pending => &[],
            Sent | Failed => &[Pending],
            Delivered => &[Sent],
            Read => &[Sent, Delivered],
        }
    }

    /// Document field holding the timestamp of reaching this status.
    pub fn timestamp_field(&self) -> Option<&'static str> {
        match self {
            NotificationStatus::Pending => None,
            NotificationStatus::Sent => Some("sent_at"),
            NotificationStatus::Failed => Some("failed_at"),
            NotificationStatus::Delivered => Some("delivered_at"),
            NotificationStatus::Read => Some("read_at"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryResult {
    pub channel: DeliveryChannel,
    pub success: bool,
    pub detail: Option<String>,
    pub at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryChannel {
    Email,
    Whatsapp,
}

impl Notification {
    pub const COLLECTION: &'static str = "notifications";
}
