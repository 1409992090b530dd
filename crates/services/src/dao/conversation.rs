use std::collections::BTreeMap;

use bson::{DateTime, doc, oid::ObjectId};
use mongodb::{Database, options::ReturnDocument};
use shiftdesk_db::models::{Conversation, ConversationMessage, Platform};
use tracing::debug;

use super::base::{BaseDao, DaoError, DaoResult, map_write_error};

pub struct ConversationDao {
    pub base: BaseDao<Conversation>,
}

fn window_start(now: DateTime) -> DateTime {
    DateTime::from_millis(now.timestamp_millis() - Conversation::SESSION_WINDOW_SECS * 1000)
}

impl ConversationDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Conversation::COLLECTION),
        }
    }

    /// Returns the user's live conversation, creating it when none exists.
    /// Stale actives (silent for more than 24h) are flagged inactive first so
    /// they are never handed out.
    pub async fn fetch_active(&self, user_id: ObjectId, platform: Platform) -> DaoResult<Conversation> {
        match self.upsert_active(user_id, platform).await {
            // Lost the race with a concurrent upsert for the same user.
            Err(DaoError::DuplicateKey(_)) => self.upsert_active(user_id, platform).await,
            other => other,
        }
    }

    async fn upsert_active(&self, user_id: ObjectId, platform: Platform) -> DaoResult<Conversation> {
        let now = DateTime::now();
        let cutoff = window_start(now);

        let retired = self
            .base
            .update_many(
                doc! { "user_id": user_id, "active": true, "last_activity": { "$lt": cutoff } },
                doc! { "$set": { "active": false } },
            )
            .await?;
        if retired > 0 {
            debug!(%user_id, retired, "Retired stale conversations");
        }

        self.base
            .collection()
            .find_one_and_update(
                doc! { "user_id": user_id, "active": true, "last_activity": { "$gte": cutoff } },
                doc! { "$setOnInsert": {
                    "platform": bson::to_bson(&platform)?,
                    "messages": [],
                    "context": {},
                    "last_activity": now,
                    "created_at": now,
                    "updated_at": now,
                } },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_write_error)?
            .ok_or(DaoError::NotFound)
    }

    /// Live conversation for the user, without creating one.
    pub async fn find_active(&self, user_id: ObjectId) -> DaoResult<Option<Conversation>> {
        self.base
            .find_one(doc! {
                "user_id": user_id,
                "active": true,
                "last_activity": { "$gte": window_start(DateTime::now()) },
            })
            .await
    }

    /// Atomically appends to the message log and bumps `last_activity`.
    pub async fn append(&self, id: ObjectId, message: &ConversationMessage) -> DaoResult<()> {
        let message = bson::to_bson(message)?;
        let matched = self
            .base
            .update_by_id(
                id,
                doc! {
                    "$push": { "messages": message },
                    "$set": { "last_activity": DateTime::now() },
                },
            )
            .await?;
        if !matched {
            return Err(DaoError::NotFound);
        }
        Ok(())
    }

    /// Overwrites the given context slots; other slots are left untouched.
    pub async fn update_context(
        &self,
        id: ObjectId,
        slots: &BTreeMap<String, serde_json::Value>,
    ) -> DaoResult<()> {
        if slots.is_empty() {
            return Ok(());
        }
        let mut set = bson::Document::new();
        for (slot, value) in slots {
            set.insert(format!("context.{slot}"), bson::to_bson(value)?);
        }
        self.base.update_by_id(id, doc! { "$set": set }).await?;
        Ok(())
    }

    /// The last `n` messages of the conversation, oldest first.
    pub async fn recent_messages(&self, id: ObjectId, n: usize) -> DaoResult<Vec<ConversationMessage>> {
        let conversation = self
            .base
            .collection()
            .find_one(doc! { "_id": id })
            .projection(doc! { "messages": { "$slice": -(n.max(1) as i64) } })
            .await?
            .ok_or(DaoError::NotFound)?;
        Ok(conversation.messages)
    }

    pub async fn count_active(&self) -> DaoResult<u64> {
        self.base
            .count(doc! {
                "active": true,
                "last_activity": { "$gte": window_start(DateTime::now()) },
            })
            .await
    }
}
