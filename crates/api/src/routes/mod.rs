pub mod absence;
pub mod auth;
pub mod briefing;
pub mod dashboard;
pub mod hour_tracking;
pub mod location;
pub mod notification;
pub mod schedule;
pub mod team;
pub mod user;
pub mod whatsapp;
