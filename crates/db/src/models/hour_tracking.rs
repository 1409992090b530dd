use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourTracking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub schedule_id: Option<ObjectId>,
    /// Calendar day of the clock-in in the configured timezone, `YYYY-MM-DD`.
    pub day: String,
    pub clock_in: DateTime,
    pub clock_out: Option<DateTime>,
    pub total_hours: Option<f64>,
    pub location_id: Option<ObjectId>,
    pub traffic: Option<TrafficSnapshot>,
    #[serde(default)]
    pub status: TrackingStatus,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrafficSnapshot {
    pub level: u8,
    pub description: String,
    pub delay_minutes: Option<f64>,
    pub captured_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    #[default]
    Active,
    Completed,
}

impl HourTracking {
    pub const COLLECTION: &'static str = "hour_tracking";
}

/// Hours between two instants, rounded to two decimals. Never negative.
pub fn worked_hours(clock_in: DateTime, clock_out: DateTime) -> f64 {
    let millis = (clock_out.timestamp_millis() - clock_in.timestamp_millis()).max(0);
    let hours = millis as f64 / 3_600_000.0;
    (hours * 100.0).round() / 100.0
}
