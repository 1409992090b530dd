use bson::{DateTime, Document, doc, oid::ObjectId};
use mongodb::Database;
use shiftdesk_db::models::{Schedule, ScheduleNotificationPrefs, ScheduleStatus};

use super::base::{BaseDao, DaoError, DaoResult};

pub struct ScheduleDao {
    pub base: BaseDao<Schedule>,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub title: String,
    pub date: DateTime,
    pub start_time: DateTime,
    pub end_time: DateTime,
    pub location_id: ObjectId,
    pub employees: Vec<ObjectId>,
    pub allow_auto_replacement: bool,
    pub notification_preferences: ScheduleNotificationPrefs,
    pub team_id: Option<ObjectId>,
    pub created_by: ObjectId,
    pub notes: Option<String>,
}

impl ScheduleDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Schedule::COLLECTION),
        }
    }

    pub async fn create(&self, new: NewSchedule) -> DaoResult<Schedule> {
        if new.end_time <= new.start_time {
            return Err(DaoError::Validation(
                "end_time must be after start_time".to_string(),
            ));
        }
        let mut employees = new.employees;
        employees.sort();
        employees.dedup();

        let now = DateTime::now();
        let schedule = Schedule {
            id: None,
            title: new.title,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            location_id: new.location_id,
            employees,
            status: ScheduleStatus::Scheduled,
            allow_auto_replacement: new.allow_auto_replacement,
            notification_preferences: new.notification_preferences,
            team_id: new.team_id,
            created_by: new.created_by,
            notes: new.notes,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&schedule).await?;
        self.base.find_by_id(id).await
    }

    fn by_start() -> Option<Document> {
        Some(doc! { "date": 1, "start_time": 1 })
    }

    /// Schedules assigned to `user_id` starting in `[from, until)`.
    pub async fn find_for_user_between(
        &self,
        user_id: ObjectId,
        from: DateTime,
        until: DateTime,
    ) -> DaoResult<Vec<Schedule>> {
        self.base
            .find_many(
                doc! {
                    "employees": user_id,
                    "start_time": { "$gte": from, "$lt": until },
                    "status": { "$ne": "cancelled" },
                },
                Self::by_start(),
            )
            .await
    }

    /// All non-cancelled schedules starting in `[from, until)`.
    pub async fn find_between(&self, from: DateTime, until: DateTime) -> DaoResult<Vec<Schedule>> {
        self.base
            .find_many(
                doc! {
                    "start_time": { "$gte": from, "$lt": until },
                    "status": { "$ne": "cancelled" },
                },
                Self::by_start(),
            )
            .await
    }

    /// First schedule of `user_id` that overlaps `[from, until)`.
    pub async fn find_overlapping(
        &self,
        user_id: ObjectId,
        from: DateTime,
        until: DateTime,
    ) -> DaoResult<Option<Schedule>> {
        Ok(self
            .base
            .collection()
            .find_one(doc! {
                "employees": user_id,
                "start_time": { "$lt": until },
                "end_time": { "$gt": from },
                "status": { "$ne": "cancelled" },
            })
            .sort(doc! { "date": 1, "start_time": 1 })
            .await?)
    }

    pub async fn list(&self, employee: Option<ObjectId>) -> DaoResult<Vec<Schedule>> {
        let filter = match employee {
            Some(user_id) => doc! { "employees": user_id },
            None => doc! {},
        };
        self.base.find_many(filter, Self::by_start()).await
    }

    pub async fn update(&self, id: ObjectId, set: Document) -> DaoResult<Schedule> {
        if !self.base.update_by_id(id, doc! { "$set": set }).await? {
            return Err(DaoError::NotFound);
        }
        self.base.find_by_id(id).await
    }
}
