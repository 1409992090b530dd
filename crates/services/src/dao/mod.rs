pub mod absence;
pub mod base;
pub mod conversation;
pub mod hour_tracking;
pub mod location;
pub mod notification;
pub mod schedule;
pub mod team;
pub mod user;
pub mod whatsapp_settings;

pub use absence::{AbsenceDao, NewAbsence};
pub use base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
pub use conversation::ConversationDao;
pub use hour_tracking::{ClockIn, HourTrackingDao};
pub use location::LocationDao;
pub use notification::{NewNotification, NotificationDao};
pub use schedule::{NewSchedule, ScheduleDao};
pub use team::TeamDao;
pub use user::{NewUser, UserDao};
pub use whatsapp_settings::WhatsAppSettingsDao;
