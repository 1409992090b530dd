use std::sync::Arc;

use mongodb::Database;

use crate::dao::{
    AbsenceDao, ConversationDao, HourTrackingDao, LocationDao, NotificationDao, ScheduleDao,
    TeamDao, UserDao, WhatsAppSettingsDao,
};

/// One handle per collection, shared by the HTTP layer and the agent.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<UserDao>,
    pub teams: Arc<TeamDao>,
    pub locations: Arc<LocationDao>,
    pub schedules: Arc<ScheduleDao>,
    pub absences: Arc<AbsenceDao>,
    pub hours: Arc<HourTrackingDao>,
    pub notifications: Arc<NotificationDao>,
    pub conversations: Arc<ConversationDao>,
    pub whatsapp_settings: Arc<WhatsAppSettingsDao>,
}

impl Stores {
    pub fn new(db: &Database) -> Self {
        Self {
            users: Arc::new(UserDao::new(db)),
            teams: Arc::new(TeamDao::new(db)),
            locations: Arc::new(LocationDao::new(db)),
            schedules: Arc::new(ScheduleDao::new(db)),
            absences: Arc::new(AbsenceDao::new(db)),
            hours: Arc::new(HourTrackingDao::new(db)),
            notifications: Arc::new(NotificationDao::new(db)),
            conversations: Arc::new(ConversationDao::new(db)),
            whatsapp_settings: Arc::new(WhatsAppSettingsDao::new(db)),
        }
    }
}
