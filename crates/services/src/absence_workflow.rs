use std::sync::Arc;

use bson::oid::ObjectId;
use shiftdesk_db::models::{Absence, AbsenceStatus, NotificationChannel, Relation, Role, User};
use tracing::{info, warn};

use crate::dao::NewAbsence;
use crate::error::{ServiceError, ServiceResult};
use crate::notify::{DispatchReport, DispatchRequest, Dispatcher};
use crate::stores::Stores;
use crate::time::LocalClock;
use crate::whatsapp::TemplateRequest;

/// Absence requests and their review, with the notifications each step triggers.
pub struct AbsenceWorkflow {
    stores: Stores,
    dispatcher: Arc<Dispatcher>,
    clock: LocalClock,
}

impl AbsenceWorkflow {
    pub fn new(stores: Stores, dispatcher: Arc<Dispatcher>, clock: LocalClock) -> Self {
        Self {
            stores,
            dispatcher,
            clock,
        }
    }

    /// Persists a pending absence and tells every admin who accepts notifications.
    pub async fn request(&self, requester: &User, new: NewAbsence) -> ServiceResult<Absence> {
        let absence = self.stores.absences.create(new).await?;
        let absence_id = absence.id;

        let admins: Vec<User> = self
            .stores
            .users
            .find_admins()
            .await?
            .into_iter()
            .filter(|a| a.notification_preferences.email || a.notification_preferences.whatsapp)
            .collect();

        let dates = self.date_span(&absence);
        let message = format!(
            "{} requested a {} absence ({dates}): {}",
            requester.name,
            absence.absence_type.as_str(),
            absence.reason
        );
        let report = self
            .dispatcher
            .dispatch(DispatchRequest {
                recipients: admins,
                channel: NotificationChannel::Both,
                subject: format!("Absence request from {}", requester.name),
                content: message.clone(),
                relation: Relation::Absence,
                related_id: absence_id,
                created_by: requester.id,
                template: Some(
                    TemplateRequest::new("general_announcement_update").slot("message", message),
                ),
            })
            .await;

        info!(absence = ?absence_id, admins_notified = report.sent, "Absence requested");
        Ok(absence)
    }

    pub async fn approve(&self, id: ObjectId, reviewer: &User) -> ServiceResult<Absence> {
        let absence = self.transition(id, AbsenceStatus::Approved, reviewer.id).await?;
        self.notify_requester(&absence, reviewer).await;
        self.solicit_replacements(&absence, reviewer).await;
        Ok(absence)
    }

    pub async fn reject(&self, id: ObjectId, reviewer: &User) -> ServiceResult<Absence> {
        let absence = self.transition(id, AbsenceStatus::Rejected, reviewer.id).await?;
        self.notify_requester(&absence, reviewer).await;
        Ok(absence)
    }

    pub async fn complete(&self, id: ObjectId, reviewer: &User) -> ServiceResult<Absence> {
        self.transition(id, AbsenceStatus::Completed, reviewer.id).await
    }

    async fn transition(
        &self,
        id: ObjectId,
        next: AbsenceStatus,
        reviewer: Option<ObjectId>,
    ) -> ServiceResult<Absence> {
        if let Some(updated) = self.stores.absences.transition(id, next, reviewer).await? {
            return Ok(updated);
        }
        let current = self.stores.absences.base.find_by_id(id).await?;
        Err(ServiceError::Validation(format!(
            "Absence is {} and cannot become {}",
            current.status.as_str(),
            next.as_str()
        )))
    }

    fn date_span(&self, absence: &Absence) -> String {
        let start = self.clock.local_date(absence.start_date);
        let end = self.clock.local_date(absence.end_date);
        if start == end {
            start.format("%Y-%m-%d").to_string()
        } else {
            format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
        }
    }

    async fn notify_requester(&self, absence: &Absence, reviewer: &User) -> Option<DispatchReport> {
        let requester = match self.stores.users.base.find_by_id(absence.user_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!(user = %absence.user_id, error = %e, "Absence requester not found");
                return None;
            }
        };
        let start = self.clock.local_date(absence.start_date).format("%Y-%m-%d").to_string();
        let end = self.clock.local_date(absence.end_date).format("%Y-%m-%d").to_string();
        let status = absence.status.as_str();

        Some(
            self.dispatcher
                .dispatch(DispatchRequest {
                    recipients: vec![requester],
                    channel: NotificationChannel::Both,
                    subject: format!("Absence request {status}"),
                    content: format!("Your absence request from {start} to {end} was {status}."),
                    relation: Relation::Absence,
                    related_id: absence.id,
                    created_by: reviewer.id,
                    template: Some(
                        TemplateRequest::new("absence_update")
                            .slot("status", status)
                            .slot("start_date", start)
                            .slot("end_date", end),
                    ),
                })
                .await,
        )
    }

    /// On an approved absence for an auto-replacement schedule, asks the
    /// team's other employees to volunteer. Nobody is assigned automatically.
    async fn solicit_replacements(&self, absence: &Absence, reviewer: &User) -> Option<DispatchReport> {
        let schedule_id = absence.schedule_id?;
        let schedule = self.stores.schedules.base.find_by_id(schedule_id).await.ok()?;
        if !schedule.allow_auto_replacement || !schedule.is_assigned(&absence.user_id) {
            return None;
        }

        let team_id = match schedule.team_id {
            Some(team_id) => team_id,
            None => self
                .stores
                .users
                .base
                .find_by_id(absence.user_id)
                .await
                .ok()?
                .team_id?,
        };
        let candidates: Vec<User> = match self.stores.users.find_by_team(team_id).await {
            Ok(users) => users
                .into_iter()
                .filter(|u| u.role == Role::Employee)
                .filter(|u| u.id.is_some_and(|id| !schedule.is_assigned(&id)))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Could not load replacement candidates");
                return None;
            }
        };
        if candidates.is_empty() {
            return None;
        }

        let message = format!(
            "A replacement is needed for {} on {} at {}. Reply to your manager if you can cover it.",
            schedule.title,
            self.clock.format_date(schedule.start_time),
            self.clock.format_time(schedule.start_time)
        );
        let report = self
            .dispatcher
            .dispatch(DispatchRequest {
                recipients: candidates,
                channel: schedule.notification_preferences.channel,
                subject: format!("Replacement needed: {}", schedule.title),
                content: message.clone(),
                relation: Relation::Schedule,
                related_id: Some(schedule_id),
                created_by: reviewer.id,
                template: Some(
                    TemplateRequest::new("general_announcement_update").slot("message", message),
                ),
            })
            .await;
        info!(schedule = %schedule_id, solicited = report.attempted, "Replacement solicitation sent");
        Some(report)
    }
}
