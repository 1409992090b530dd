use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub owner_id: ObjectId,
    pub join_code: String,
    #[serde(default)]
    pub departments: Vec<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Team {
    pub const COLLECTION: &'static str = "teams";
}
