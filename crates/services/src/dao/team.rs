use bson::{DateTime, doc, oid::ObjectId};
use mongodb::Database;
use shiftdesk_db::models::Team;

use super::base::{BaseDao, DaoError, DaoResult};

const JOIN_CODE_ALPHABET: [char; 32] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T',
    'U', 'V', 'W', 'X', 'Y', 'Z', '2', '3', '4', '5', '6', '7', '8', '9',
];

pub struct TeamDao {
    pub base: BaseDao<Team>,
}

impl TeamDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Team::COLLECTION),
        }
    }

    pub async fn create(
        &self,
        name: String,
        owner_id: ObjectId,
        departments: Vec<String>,
    ) -> DaoResult<Team> {
        let now = DateTime::now();
        let team = Team {
            id: None,
            name,
            owner_id,
            join_code: nanoid::nanoid!(8, &JOIN_CODE_ALPHABET),
            departments,
            created_at: now,
            updated_at: now,
        };

        let id = self.base.insert_one(&team).await?;
        self.base.find_by_id(id).await
    }

    pub async fn find_by_join_code(&self, code: &str) -> DaoResult<Team> {
        self.base
            .find_one(doc! { "join_code": code.trim().to_uppercase() })
            .await?
            .ok_or(DaoError::NotFound)
    }
}
