use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use shiftdesk_db::models::{HourTracking, TrackingStatus, TrafficSnapshot, worked_hours};

use super::base::{BaseDao, DaoError, DaoResult};

pub struct HourTrackingDao {
    pub base: BaseDao<HourTracking>,
}

#[derive(Debug, Clone)]
pub struct ClockIn {
    pub user_id: ObjectId,
    pub schedule_id: Option<ObjectId>,
    pub day: String,
    pub location_id: Option<ObjectId>,
    pub traffic: Option<TrafficSnapshot>,
}

impl HourTrackingDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, HourTracking::COLLECTION),
        }
    }

    /// Opens a record. A second open record for the same user and day is
    /// rejected by the partial unique index as `DuplicateKey`.
    pub async fn clock_in(&self, input: ClockIn) -> DaoResult<HourTracking> {
        let now = DateTime::now();
        let record = HourTracking {
            id: None,
            user_id: input.user_id,
            schedule_id: input.schedule_id,
            day: input.day,
            clock_in: now,
            clock_out: None,
            total_hours: None,
            location_id: input.location_id,
            traffic: input.traffic,
            status: TrackingStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&record).await?;
        self.base.find_by_id(id).await
    }

    /// Closes an active record owned by `user_id`.
    pub async fn clock_out(&self, id: ObjectId, user_id: ObjectId) -> DaoResult<HourTracking> {
        let record = self
            .base
            .find_one(doc! { "_id": id, "user_id": user_id })
            .await?
            .ok_or(DaoError::NotFound)?;
        if record.status != TrackingStatus::Active {
            return Err(DaoError::Validation("already clocked out".to_string()));
        }

        let now = DateTime::now();
        let matched = self
            .base
            .update_one(
                doc! { "_id": id, "status": "active" },
                doc! { "$set": {
                    "clock_out": now,
                    "total_hours": worked_hours(record.clock_in, now),
                    "status": "completed",
                } },
            )
            .await?;
        if !matched {
            return Err(DaoError::Validation("already clocked out".to_string()));
        }
        self.base.find_by_id(id).await
    }

    pub async fn list(&self, user_id: Option<ObjectId>) -> DaoResult<Vec<HourTracking>> {
        let filter = match user_id {
            Some(user_id) => doc! { "user_id": user_id },
            None => doc! {},
        };
        self.base
            .find_many(filter, Some(doc! { "clock_in": -1 }))
            .await
    }
}
