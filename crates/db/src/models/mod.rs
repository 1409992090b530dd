pub mod absence;
pub mod conversation;
pub mod hour_tracking;
pub mod location;
pub mod notification;
pub mod schedule;
pub mod team;
pub mod user;
pub mod whatsapp_settings;

pub use absence::*;
pub use conversation::*;
pub use hour_tracking::*;
pub use location::*;
pub use notification::*;
pub use schedule::*;
pub use team::*;
pub use user::*;
pub use whatsapp_settings::*;
