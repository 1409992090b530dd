pub mod dispatcher;
pub mod traffic_alerts;

pub use dispatcher::{DispatchReport, DispatchRequest, Dispatcher};
pub use traffic_alerts::{TrafficAlertJob, TrafficAlertReport};
