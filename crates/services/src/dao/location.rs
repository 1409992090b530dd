use bson::{DateTime, Document, doc, oid::ObjectId};
use mongodb::Database;
use shiftdesk_db::models::{Address, GeoPoint, Location};

use super::base::{BaseDao, DaoError, DaoResult};

pub struct LocationDao {
    pub base: BaseDao<Location>,
}

impl LocationDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Location::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        name: String,
        address: Address,
        coordinates: GeoPoint,
        team_id: Option<ObjectId>,
    ) -> DaoResult<Location> {
        let now = DateTime::now();
        let location = Location {
            id: None,
            name,
            address,
            coordinates,
            is_active: true,
            team_id,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&location).await?;
        self.base.find_by_id(id).await
    }

    pub async fn list(&self, team_id: Option<ObjectId>) -> DaoResult<Vec<Location>> {
        let filter = match team_id {
            Some(team_id) => doc! { "team_id": team_id },
            None => doc! {},
        };
        self.base.find_many(filter, Some(doc! { "name": 1 })).await
    }

    pub async fn update(&self, id: ObjectId, set: Document) -> DaoResult<Location> {
        if !self.base.update_by_id(id, doc! { "$set": set }).await? {
            return Err(DaoError::NotFound);
        }
        self.base.find_by_id(id).await
    }
}
