use bson::{DateTime, Document, doc, oid::ObjectId};
use mongodb::Database;
use shiftdesk_db::models::{NotificationPrefs, Role, User, digits_only, normalize_phone};

use super::base::{BaseDao, DaoError, DaoResult};

pub struct UserDao {
    pub base: BaseDao<User>,
}

/// Fields supplied when a user is registered or created by an admin.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub role: Role,
    pub team_id: Option<ObjectId>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub preferred_language: Option<String>,
    pub notification_preferences: Option<NotificationPrefs>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    pub async fn create(&self, new: NewUser) -> DaoResult<User> {
        let now = DateTime::now();
        let user = User {
            id: None,
            name: new.name,
            email: new.email.trim().to_lowercase(),
            password_hash: Some(new.password_hash),
            phone: new.phone.as_deref().and_then(normalize_phone),
            role: new.role,
            team_id: new.team_id,
            position: new.position,
            department: new.department,
            notification_preferences: new.notification_preferences.unwrap_or_default(),
            default_location_id: None,
            preferred_language: new.preferred_language.unwrap_or_else(|| "en".to_string()),
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&user).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email.trim().to_lowercase() })
            .await?
            .ok_or(DaoError::NotFound)
    }

    /// Looks a user up by phone, comparing digits only.
    pub async fn find_by_phone(&self, phone: &str) -> DaoResult<Option<User>> {
        let digits = digits_only(phone);
        if digits.is_empty() {
            return Ok(None);
        }
        self.base
            .find_one(doc! { "phone": { "$in": [format!("+{digits}"), digits] } })
            .await
    }

    pub async fn list_all(&self) -> DaoResult<Vec<User>> {
        self.base.find_many(doc! {}, Some(doc! { "name": 1 })).await
    }

    pub async fn find_admins(&self) -> DaoResult<Vec<User>> {
        self.base
            .find_many(doc! { "role": Role::Admin.as_str() }, Some(doc! { "name": 1 }))
            .await
    }

    pub async fn find_with_phone(&self) -> DaoResult<Vec<User>> {
        self.base
            .find_many(
                doc! { "phone": { "$exists": true, "$ne": null } },
                Some(doc! { "name": 1 }),
            )
            .await
    }

    pub async fn find_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.base.find_many(doc! { "_id": { "$in": ids } }, None).await
    }

    pub async fn find_by_team(&self, team_id: ObjectId) -> DaoResult<Vec<User>> {
        self.base
            .find_many(doc! { "team_id": team_id }, Some(doc! { "name": 1 }))
            .await
    }

    pub async fn find_by_phone_fragment(&self, fragment: &str) -> DaoResult<Option<User>> {
        let digits = digits_only(fragment);
        if digits.is_empty() {
            return Ok(None);
        }
        self.base
            .find_one(doc! { "phone": { "$regex": regex::escape(&digits) } })
            .await
    }

    /// Case-insensitive exact match on the display name.
    pub async fn find_by_name(&self, name: &str) -> DaoResult<Option<User>> {
        let pattern = format!("^{}$", regex::escape(name.trim()));
        self.base
            .find_one(doc! { "name": { "$regex": pattern, "$options": "i" } })
            .await
    }

    pub async fn update(&self, id: ObjectId, set: Document) -> DaoResult<User> {
        if !self.base.update_by_id(id, doc! { "$set": set }).await? {
            return Err(DaoError::NotFound);
        }
        self.base.find_by_id(id).await
    }

    pub async fn set_role_and_team(
        &self,
        id: ObjectId,
        role: Role,
        team_id: ObjectId,
    ) -> DaoResult<bool> {
        self.base
            .update_by_id(
                id,
                doc! { "$set": { "role": role.as_str(), "team_id": team_id } },
            )
            .await
    }
}
