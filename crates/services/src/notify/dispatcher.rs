use std::sync::Arc;

use bson::{DateTime, oid::ObjectId};
use futures::StreamExt;
use serde::Serialize;
use shiftdesk_db::models::{DeliveryChannel, DeliveryResult, NotificationChannel, Relation, User};
use tracing::{debug, info, warn};

use crate::dao::{NewNotification, NotificationDao};
use crate::providers::Mailer;
use crate::whatsapp::{OutboundPolicy, TemplateRequest, mask_phone};

/// One logical notification addressed to many users.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub recipients: Vec<User>,
    pub channel: NotificationChannel,
    pub subject: String,
    pub content: String,
    pub relation: Relation,
    pub related_id: Option<ObjectId>,
    pub created_by: Option<ObjectId>,
    /// Template used outside the WhatsApp session window. The `name` slot is
    /// filled per recipient.
    pub template: Option<TemplateRequest>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    pub notification_ids: Vec<ObjectId>,
}

enum Outcome {
    Sent(ObjectId),
    Failed(Option<ObjectId>),
}

/// Fans notifications out over email and WhatsApp with bounded concurrency.
pub struct Dispatcher {
    notifications: Arc<NotificationDao>,
    mailer: Arc<dyn Mailer>,
    policy: Arc<OutboundPolicy>,
    max_concurrency: usize,
}

impl Dispatcher {
    pub fn new(
        notifications: Arc<NotificationDao>,
        mailer: Arc<dyn Mailer>,
        policy: Arc<OutboundPolicy>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            notifications,
            mailer,
            policy,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub async fn dispatch(&self, request: DispatchRequest) -> DispatchReport {
        let attempted = request.recipients.len();
        let deliveries: Vec<_> = request
            .recipients
            .iter()
            .map(|recipient| self.deliver(recipient, &request))
            .collect();
        let outcomes: Vec<Outcome> = futures::stream::iter(deliveries)
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut report = DispatchReport {
            attempted,
            ..Default::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Sent(id) => {
                    report.sent += 1;
                    report.notification_ids.push(id);
                }
                Outcome::Failed(id) => {
                    report.failed += 1;
                    report.notification_ids.extend(id);
                }
            }
        }

        info!(
            relation = ?request.relation,
            attempted = report.attempted,
            sent = report.sent,
            failed = report.failed,
            "Notification batch dispatched"
        );
        report
    }

    async fn deliver(&self, user: &User, request: &DispatchRequest) -> Outcome {
        let Some(recipient_id) = user.id else {
            return Outcome::Failed(None);
        };

        let template = request
            .template
            .clone()
            .map(|t| t.slot("name", user.name.clone()));
        let content = self
            .policy
            .preview(user, &request.content, template.as_ref())
            .await;

        let id = match self
            .notifications
            .create_pending(NewNotification {
                channel: request.channel,
                recipient_id,
                subject: request.subject.clone(),
                content: content.clone(),
                relation: request.relation,
                related_id: request.related_id,
                created_by: request.created_by,
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(%recipient_id, error = %e, "Could not record notification");
                return Outcome::Failed(None);
            }
        };

        let mut deliveries = Vec::new();
        let prefs = &user.notification_preferences;

        if request.channel.allows_email() && prefs.email && !user.email.is_empty() {
            let result = self.mailer.send(&user.email, &request.subject, &content).await;
            deliveries.push(delivery(DeliveryChannel::Email, result.err().map(|e| e.to_string())));
        }

        if request.channel.allows_whatsapp() && prefs.whatsapp {
            if let Some(phone) = user.phone_digits() {
                let result = self.policy.send(user, &content, template.as_ref()).await;
                if let Err(e) = &result {
                    warn!(to = %mask_phone(&phone), error = %e, "WhatsApp delivery failed");
                }
                deliveries.push(delivery(DeliveryChannel::Whatsapp, result.err().map(|e| e.to_string())));
            }
        }

        let error = if deliveries.is_empty() {
            Some("no deliverable channel".to_string())
        } else if deliveries.iter().any(|d| d.success) {
            None
        } else {
            Some(
                deliveries
                    .iter()
                    .filter_map(|d| d.detail.clone())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };

        match self.notifications.finish(id, &deliveries, error).await {
            Ok(status) => {
                debug!(%recipient_id, notification = %id, ?status, "Notification finished");
                if deliveries.iter().any(|d| d.success) {
                    Outcome::Sent(id)
                } else {
                    Outcome::Failed(Some(id))
                }
            }
            Err(e) => {
                warn!(notification = %id, error = %e, "Could not record delivery state");
                Outcome::Failed(Some(id))
            }
        }
    }
}

fn delivery(channel: DeliveryChannel, error: Option<String>) -> DeliveryResult {
    DeliveryResult {
        channel,
        success: error.is_none(),
        detail: error,
        at: DateTime::now(),
    }
}
