pub mod absence_workflow;
pub mod assistant;
pub mod auth;
pub mod briefing;
pub mod dao;
pub mod error;
pub mod media_decoder;
pub mod notify;
pub mod providers;
pub mod stores;
pub mod time;
pub mod whatsapp;

pub use absence_workflow::AbsenceWorkflow;
pub use assistant::{AssistantDeps, WhatsAppAgent};
pub use auth::AuthService;
pub use briefing::{BriefingService, DailyBriefing};
pub use dao::*;
pub use error::{ProviderError, ServiceError, ServiceResult};
pub use media_decoder::{MediaDecoder, MediaError};
pub use notify::{DispatchReport, DispatchRequest, Dispatcher, TrafficAlertJob};
pub use stores::Stores;
pub use time::LocalClock;
