use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use shiftdesk_db::models::{Absence, AbsenceStatus, AbsenceType};

use super::base::{BaseDao, DaoError, DaoResult};

pub struct AbsenceDao {
    pub base: BaseDao<Absence>,
}

#[derive(Debug, Clone)]
pub struct NewAbsence {
    pub user_id: ObjectId,
    pub schedule_id: Option<ObjectId>,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub reason: String,
    pub absence_type: AbsenceType,
    pub replacement_needed: bool,
}

impl AbsenceDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Absence::COLLECTION),
        }
    }

    pub async fn create(&self, new: NewAbsence) -> DaoResult<Absence> {
        if new.end_date < new.start_date {
            return Err(DaoError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }
        let now = DateTime::now();
        let absence = Absence {
            id: None,
            user_id: new.user_id,
            schedule_id: new.schedule_id,
            start_date: new.start_date,
            end_date: new.end_date,
            reason: new.reason,
            absence_type: new.absence_type,
            status: AbsenceStatus::Pending,
            replacement_needed: new.replacement_needed,
            replacement_id: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&absence).await?;
        self.base.find_by_id(id).await
    }

    /// Moves the absence to `next` only if it is currently in the single
    /// allowed predecessor status. Returns `None` when the guard did not match.
    pub async fn transition(
        &self,
        id: ObjectId,
        next: AbsenceStatus,
        reviewer: Option<ObjectId>,
    ) -> DaoResult<Option<Absence>> {
        let Some(expected) = next.required_predecessor() else {
            return Ok(None);
        };

        let mut set = doc! { "status": next.as_str() };
        if let Some(reviewer) = reviewer {
            set.insert("reviewed_by", reviewer);
            set.insert("reviewed_at", DateTime::now());
        }

        let matched = self
            .base
            .update_one(
                doc! { "_id": id, "status": expected.as_str() },
                doc! { "$set": set },
            )
            .await?;
        if !matched {
            return Ok(None);
        }
        self.base.find_by_id(id).await.map(Some)
    }

    pub async fn list_pending(&self) -> DaoResult<Vec<Absence>> {
        self.base
            .find_many(
                doc! { "status": AbsenceStatus::Pending.as_str() },
                Some(doc! { "created_at": 1 }),
            )
            .await
    }

    /// Most recent pending absence, optionally restricted to one user.
    pub async fn latest_pending(&self, user_id: Option<ObjectId>) -> DaoResult<Option<Absence>> {
        let mut filter = doc! { "status": AbsenceStatus::Pending.as_str() };
        if let Some(user_id) = user_id {
            filter.insert("user_id", user_id);
        }
        Ok(self
            .base
            .collection()
            .find_one(filter)
            .sort(doc! { "created_at": -1, "_id": -1 })
            .await?)
    }

    pub async fn list(&self, user_id: Option<ObjectId>) -> DaoResult<Vec<Absence>> {
        let filter = match user_id {
            Some(user_id) => doc! { "user_id": user_id },
            None => doc! {},
        };
        self.base
            .find_many(filter, Some(doc! { "created_at": -1 }))
            .await
    }
}
