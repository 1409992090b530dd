use std::collections::HashMap;
use std::sync::Arc;

use bson::{doc, oid::ObjectId};
use serde::Serialize;
use shiftdesk_db::models::{Location, User};
use tracing::warn;

use crate::error::{ServiceError, ServiceResult};
use crate::providers::TrafficProvider;
use crate::stores::Stores;
use crate::time::LocalClock;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BriefingTraffic {
    pub level: u8,
    pub description: String,
    pub delay_minutes: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BriefingShift {
    pub schedule_id: Option<String>,
    pub title: String,
    pub start: String,
    pub end: String,
    pub location: String,
    pub address: String,
    /// `None` when the traffic provider did not answer.
    pub traffic: Option<BriefingTraffic>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyBriefing {
    pub date: String,
    pub name: String,
    pub shifts: Vec<BriefingShift>,
    pub unread_notifications: u64,
    /// Only filled for admins.
    pub pending_absences: Option<u64>,
    pub text: String,
}

/// Today's shifts, commute conditions and open items for one user,
/// assembled on request.
pub struct BriefingService {
    stores: Stores,
    maps: Arc<dyn TrafficProvider>,
    clock: LocalClock,
}

impl BriefingService {
    pub fn new(stores: Stores, maps: Arc<dyn TrafficProvider>, clock: LocalClock) -> Self {
        Self { stores, maps, clock }
    }

    pub async fn assemble(&self, user: &User) -> ServiceResult<DailyBriefing> {
        let user_id = user
            .id
            .ok_or_else(|| ServiceError::Internal("user without id".to_string()))?;
        let today = self.clock.today();
        let (from, until) = self.clock.day_range(today);

        let schedules = self
            .stores
            .schedules
            .find_for_user_between(user_id, from, until)
            .await?;

        let mut locations: HashMap<ObjectId, Option<Location>> = HashMap::new();
        let mut traffic: HashMap<ObjectId, Option<BriefingTraffic>> = HashMap::new();
        let mut shifts = Vec::with_capacity(schedules.len());
        for schedule in &schedules {
            if !locations.contains_key(&schedule.location_id) {
                let location = self
                    .stores
                    .locations
                    .base
                    .find_one(doc! { "_id": schedule.location_id })
                    .await?;
                locations.insert(schedule.location_id, location);
            }
            let location = locations.get(&schedule.location_id).cloned().flatten();

            let conditions = match (&location, traffic.get(&schedule.location_id)) {
                (_, Some(cached)) => cached.clone(),
                (Some(location), None) => {
                    let fetched = match self.maps.traffic(location.coordinates).await {
                        Ok(info) => Some(BriefingTraffic {
                            level: info.level,
                            description: info.description,
                            delay_minutes: info.delay_minutes,
                        }),
                        Err(e) => {
                            warn!(location = %location.name, error = %e, "Briefing traffic lookup failed");
                            None
                        }
                    };
                    traffic.insert(schedule.location_id, fetched.clone());
                    fetched
                }
                (None, None) => None,
            };

            shifts.push(BriefingShift {
                schedule_id: schedule.id.map(|id| id.to_hex()),
                title: schedule.title.clone(),
                start: self.clock.format_time(schedule.start_time),
                end: self.clock.format_time(schedule.end_time),
                location: location
                    .as_ref()
                    .map(|l| l.name.clone())
                    .unwrap_or_else(|| "unknown location".to_string()),
                address: location
                    .as_ref()
                    .map(|l| l.address.one_line())
                    .unwrap_or_default(),
                traffic: conditions,
            });
        }

        let unread_notifications = self
            .stores
            .notifications
            .base
            .count(doc! {
                "recipient_id": user_id,
                "status": { "$in": ["sent", "delivered"] },
            })
            .await?;
        let pending_absences = if user.is_admin() {
            Some(
                self.stores
                    .absences
                    .base
                    .count(doc! { "status": "pending" })
                    .await?,
            )
        } else {
            None
        };

        let mut briefing = DailyBriefing {
            date: today.format("%A %d %B %Y").to_string(),
            name: user.name.clone(),
            shifts,
            unread_notifications,
            pending_absences,
            text: String::new(),
        };
        briefing.text = render_text(&briefing);
        Ok(briefing)
    }
}

/// Plain-text rendering suitable for email or WhatsApp.
pub fn render_text(briefing: &DailyBriefing) -> String {
    let mut lines = vec![format!("Good morning {}! Here is your briefing for {}.", briefing.name, briefing.date)];
    if briefing.shifts.is_empty() {
        lines.push("You have no shifts today.".to_string());
    } else {
        for shift in &briefing.shifts {
            let mut line = format!(
                "- {}-{} {} at {}",
                shift.start, shift.end, shift.title, shift.location
            );
            if let Some(traffic) = &shift.traffic {
                line.push_str(&format!(", traffic: {}", traffic.description));
                if traffic.delay_minutes > 0.0 {
                    line.push_str(&format!(" (+{:.0} min)", traffic.delay_minutes));
                }
            }
            lines.push(line);
        }
    }
    if briefing.unread_notifications > 0 {
        lines.push(format!("Unread notifications: {}", briefing.unread_notifications));
    }
    if let Some(pending) = briefing.pending_absences.filter(|n| *n > 0) {
        lines.push(format!("Absence requests awaiting review: {pending}"));
    }
    lines.join("\n")
}
