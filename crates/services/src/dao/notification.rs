use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use shiftdesk_db::models::{
    DeliveryResult, Notification, NotificationChannel, NotificationStatus, Relation,
};

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};

pub struct NotificationDao {
    pub base: BaseDao<Notification>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub channel: NotificationChannel,
    pub recipient_id: ObjectId,
    pub subject: String,
    pub content: String,
    pub relation: Relation,
    pub related_id: Option<ObjectId>,
    pub created_by: Option<ObjectId>,
}

impl NotificationDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Notification::COLLECTION),
        }
    }

    pub async fn create_pending(&self, new: NewNotification) -> DaoResult<ObjectId> {
        let now = DateTime::now();
        let notification = Notification {
            id: None,
            channel: new.channel,
            recipient_id: new.recipient_id,
            subject: new.subject,
            content: new.content,
            relation: new.relation,
            related_id: new.related_id,
            status: NotificationStatus::Pending,
            sent_at: None,
            delivered_at: None,
            read_at: None,
            failed_at: None,
            deliveries: Vec::new(),
            error: None,
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        self.base.insert_one(&notification).await
    }

    /// Records the outcome of every channel attempt and moves the
    /// notification out of `pending` in a single conditional update.
    pub async fn finish(
        &self,
        id: ObjectId,
        deliveries: &[DeliveryResult],
        error: Option<String>,
    ) -> DaoResult<NotificationStatus> {
        let status = if deliveries.iter().any(|d| d.success) {
            NotificationStatus::Sent
        } else {
            NotificationStatus::Failed
        };
        let deliveries = bson::to_bson(deliveries)?;
        let mut set = doc! { "deliveries": deliveries, "error": error };
        self.advance_with(id, status, &mut set).await?;
        Ok(status)
    }

    /// Steps the notification forward to `next` if its current status allows it.
    pub async fn advance(&self, id: ObjectId, next: NotificationStatus) -> DaoResult<bool> {
        self.advance_with(id, next, &mut doc! {}).await
    }

    async fn advance_with(
        &self,
        id: ObjectId,
        next: NotificationStatus,
        set: &mut bson::Document,
    ) -> DaoResult<bool> {
        let allowed: Vec<&str> = next.predecessors().iter().map(|s| s.as_str()).collect();
        if allowed.is_empty() {
            return Ok(false);
        }
        set.insert("status", next.as_str());
        if let Some(field) = next.timestamp_field() {
            set.insert(field, DateTime::now());
        }
        self.base
            .update_one(
                doc! { "_id": id, "status": { "$in": allowed } },
                doc! { "$set": set.clone() },
            )
            .await
    }

    pub async fn list_for_recipient(
        &self,
        recipient_id: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Notification>> {
        self.base
            .find_paginated(doc! { "recipient_id": recipient_id }, None, params)
            .await
    }

    /// Whether `recipient_id` was already notified about `related_id` under `relation`.
    pub async fn exists_for(
        &self,
        recipient_id: ObjectId,
        relation: Relation,
        related_id: ObjectId,
    ) -> DaoResult<bool> {
        let count = self
            .base
            .count(doc! {
                "recipient_id": recipient_id,
                "relation": bson::to_bson(&relation)?,
                "related_id": related_id,
            })
            .await?;
        Ok(count > 0)
    }
}
