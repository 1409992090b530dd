use axum::{Json, extract::State};
use bson::{DateTime, doc};
use serde::Serialize;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub scope: &'static str,
    pub schedules_today: u64,
    pub upcoming_schedules: u64,
    pub pending_absences: u64,
    pub active_clock_ins: u64,
    pub unread_notifications: u64,
    /// Admin scope only.
    pub users: Option<u64>,
    /// Admin scope only.
    pub locations: Option<u64>,
    /// Admin scope only.
    pub active_conversations: Option<u64>,
}

/// Global counts for admins, the caller's own counts for employees.
pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DashboardStats>, ApiError> {
    let stores = &state.stores;
    let (from, until) = state.clock.day_range(state.clock.today());
    let today = state.clock.day_key(DateTime::now());

    let mut schedule_today = doc! {
        "start_time": { "$gte": from, "$lt": until },
        "status": { "$ne": "cancelled" },
    };
    let mut upcoming = doc! {
        "start_time": { "$gte": DateTime::now() },
        "status": "scheduled",
    };
    let mut pending = doc! { "status": "pending" };
    let mut clocked_in = doc! { "status": "active", "day": today };
    let unread = doc! {
        "recipient_id": auth.user_id,
        "status": { "$in": ["sent", "delivered"] },
    };

    let admin = auth.is_admin();
    if !admin {
        schedule_today.insert("employees", auth.user_id);
        upcoming.insert("employees", auth.user_id);
        pending.insert("user_id", auth.user_id);
        clocked_in.insert("user_id", auth.user_id);
    }

    let mut stats = DashboardStats {
        scope: if admin { "global" } else { "own" },
        schedules_today: stores.schedules.base.count(schedule_today).await?,
        upcoming_schedules: stores.schedules.base.count(upcoming).await?,
        pending_absences: stores.absences.base.count(pending).await?,
        active_clock_ins: stores.hours.base.count(clocked_in).await?,
        unread_notifications: stores.notifications.base.count(unread).await?,
        users: None,
        locations: None,
        active_conversations: None,
    };
    if admin {
        stats.users = Some(stores.users.base.count(doc! {}).await?);
        stats.locations = Some(stores.locations.base.count(doc! { "is_active": true }).await?);
        stats.active_conversations = Some(stores.conversations.count_active().await?);
    }

    Ok(Json(stats))
}
