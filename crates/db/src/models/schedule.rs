use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

use super::notification::NotificationChannel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    /// Local midnight of the shift's calendar day.
    pub date: DateTime,
    pub start_time: DateTime,
    pub end_time: DateTime,
    pub location_id: ObjectId,
    #[serde(default)]
    pub employees: Vec<ObjectId>,
    #[serde(default)]
    pub status: ScheduleStatus,
    #[serde(default)]
    pub allow_auto_replacement: bool,
    #[serde(default)]
    pub notification_preferences: ScheduleNotificationPrefs,
    pub team_id: Option<ObjectId>,
    pub created_by: ObjectId,
    pub notes: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleNotificationPrefs {
    #[serde(default)]
    pub channel: NotificationChannel,
    #[serde(default = "bool_true")]
    pub remind: bool,
}

impl Default for ScheduleNotificationPrefs {
    fn default() -> Self {
        Self {
            channel: NotificationChannel::Both,
            remind: true,
        }
    }
}

fn bool_true() -> bool {
    true
}

impl Schedule {
    pub const COLLECTION: &'static str = "schedules";

    pub fn is_assigned(&self, user_id: &ObjectId) -> bool {
        self.employees.contains(user_id)
    }
}
