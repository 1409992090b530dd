use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Absence {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub schedule_id: Option<ObjectId>,
    pub start_date: DateTime,
    pub end_date: DateTime,
    pub reason: String,
    #[serde(default)]
    pub absence_type: AbsenceType,
    #[serde(default)]
    pub status: AbsenceStatus,
    #[serde(default)]
    pub replacement_needed: bool,
    pub replacement_id: Option<ObjectId>,
    pub reviewed_by: Option<ObjectId>,
    pub reviewed_at: Option<DateTime>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceType {
    Sick,
    Vacation,
    Personal,
    #[default]
    Other,
}

impl AbsenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbsenceType::Sick => "sick",
            AbsenceType::Vacation => "vacation",
            AbsenceType::Personal => "personal",
            AbsenceType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl AbsenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbsenceStatus::Pending => "pending",
            AbsenceStatus::Approved => "approved",
            AbsenceStatus::Rejected => "rejected",
            AbsenceStatus::Completed => "completed",
        }
    }

    /// The only status an absence may be in right before moving to `self`.
    pub fn required_predecessor(&self) -> Option<AbsenceStatus> {
        match self {
            AbsenceStatus::Approved | AbsenceStatus::Rejected => Some(AbsenceStatus::Pending),
            AbsenceStatus::Completed => Some(AbsenceStatus::Approved),
            AbsenceStatus::Pending => None,
        }
    }

    pub fn can_transition_to(&self, next: AbsenceStatus) -> bool {
        next.required_predecessor() == Some(*self)
    }
}

impl Absence {
    pub const COLLECTION: &'static str = "absences";
}
