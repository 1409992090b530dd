use bson::{DateTime, doc};
use mongodb::{Database, options::ReturnDocument};
use shiftdesk_db::models::WhatsAppSettings;

use super::base::{BaseDao, DaoError, DaoResult};

pub struct WhatsAppSettingsDao {
    pub base: BaseDao<WhatsAppSettings>,
}

impl WhatsAppSettingsDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, WhatsAppSettings::COLLECTION),
        }
    }

    /// Loads the singleton, seeding it with the built-in defaults on first use.
    pub async fn get_or_create(&self) -> DaoResult<WhatsAppSettings> {
        let mut seed = bson::to_document(&WhatsAppSettings::default())?;
        seed.remove("_id");

        self.base
            .collection()
            .find_one_and_update(
                doc! { "_id": WhatsAppSettings::GLOBAL_ID },
                doc! { "$setOnInsert": seed },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or(DaoError::NotFound)
    }

    pub async fn replace(&self, mut settings: WhatsAppSettings) -> DaoResult<WhatsAppSettings> {
        settings.id = WhatsAppSettings::GLOBAL_ID.to_string();
        settings.updated_at = DateTime::now();
        self.base
            .collection()
            .replace_one(doc! { "_id": WhatsAppSettings::GLOBAL_ID }, &settings)
            .upsert(true)
            .await?;
        Ok(settings)
    }
}
