use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bson::oid::ObjectId;
use chrono::Days;
use serde::Serialize;
use shiftdesk_db::models::{Location, Relation};
use tracing::{info, warn};

use super::dispatcher::{DispatchRequest, Dispatcher};
use crate::error::ServiceResult;
use crate::providers::{TrafficInfo, TrafficProvider};
use crate::stores::Stores;
use crate::time::LocalClock;
use crate::whatsapp::TemplateRequest;

/// Alerts fire from this level upward (moderate).
pub const ALERT_LEVEL: u8 = 2;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TrafficAlertReport {
    pub schedules_checked: usize,
    pub schedules_alerted: usize,
    pub notifications_sent: usize,
}

/// Warns assigned employees about congestion near their upcoming shifts.
pub struct TrafficAlertJob {
    stores: Stores,
    maps: Arc<dyn TrafficProvider>,
    dispatcher: Arc<Dispatcher>,
    clock: LocalClock,
}

impl TrafficAlertJob {
    pub fn new(
        stores: Stores,
        maps: Arc<dyn TrafficProvider>,
        dispatcher: Arc<Dispatcher>,
        clock: LocalClock,
    ) -> Self {
        Self {
            stores,
            maps,
            dispatcher,
            clock,
        }
    }

    pub async fn run(&self) -> ServiceResult<TrafficAlertReport> {
        let today = self.clock.today();
        let (from, until) = self.clock.range(today, today + Days::new(2));
        let schedules = self.stores.schedules.find_between(from, until).await?;

        let mut report = TrafficAlertReport {
            schedules_checked: schedules.len(),
            ..Default::default()
        };
        let mut locations: HashMap<ObjectId, Option<Location>> = HashMap::new();
        let mut traffic: HashMap<ObjectId, Option<TrafficInfo>> = HashMap::new();
        let mut notified: HashSet<(ObjectId, ObjectId)> = HashSet::new();

        for schedule in schedules {
            let Some(schedule_id) = schedule.id else { continue };

            if !locations.contains_key(&schedule.location_id) {
                let found = self
                    .stores
                    .locations
                    .base
                    .find_one(bson::doc! { "_id": schedule.location_id })
                    .await?;
                locations.insert(schedule.location_id, found);
            }
            let Some(location) = locations[&schedule.location_id].clone() else {
                continue;
            };

            if !traffic.contains_key(&schedule.location_id) {
                let info = match self.maps.traffic(location.coordinates).await {
                    Ok(info) => Some(info),
                    Err(e) => {
                        warn!(location = %location.name, error = %e, "Traffic lookup failed");
                        None
                    }
                };
                traffic.insert(schedule.location_id, info);
            }
            let Some(info) = traffic[&schedule.location_id].clone() else {
                continue;
            };
            if info.level < ALERT_LEVEL {
                continue;
            }

            let mut recipient_ids = Vec::new();
            for employee in &schedule.employees {
                if !notified.insert((*employee, schedule_id)) {
                    continue;
                }
                // Earlier runs already warned this employee about this shift.
                if self
                    .stores
                    .notifications
                    .exists_for(*employee, Relation::Traffic, schedule_id)
                    .await?
                {
                    continue;
                }
                recipient_ids.push(*employee);
            }
            if recipient_ids.is_empty() {
                continue;
            }
            let recipients = self.stores.users.find_by_ids(&recipient_ids).await?;

            let delay = format!("{:.0}", info.delay_minutes);
            let start = self.clock.format_time(schedule.start_time);
            let dispatch = self
                .dispatcher
                .dispatch(DispatchRequest {
                    recipients,
                    channel: schedule.notification_preferences.channel,
                    subject: format!("Traffic alert: {}", schedule.title),
                    content: format!(
                        "{} traffic near {} before {} ({start}). Expect about {delay} extra minutes.",
                        capitalize(&info.description),
                        location.name,
                        schedule.title
                    ),
                    relation: Relation::Traffic,
                    related_id: Some(schedule_id),
                    created_by: None,
                    template: Some(
                        TemplateRequest::new("traffic_alert")
                            .slot("title", schedule.title.clone())
                            .slot("level", info.description.clone())
                            .slot("delay_minutes", delay.clone())
                            .slot("location", location.name.clone()),
                    ),
                })
                .await;

            report.schedules_alerted += 1;
            report.notifications_sent += dispatch.sent;
        }

        info!(
            checked = report.schedules_checked,
            alerted = report.schedules_alerted,
            sent = report.notifications_sent,
            "Traffic alert run finished"
        );
        Ok(report)
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
