use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};
use shiftdesk_db::models::{HourTracking, TrackingStatus, TrafficSnapshot};
use shiftdesk_services::{
    dao::{ClockIn, base::DaoError},
    providers::TrafficProvider,
};
use tracing::{info, warn};

use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, parse_id},
    state::AppState,
};

#[derive(Debug, Default, Deserialize)]
pub struct ClockInRequest {
    pub schedule_id: Option<String>,
    /// Falls back to the schedule's location.
    pub location_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrafficSnapshotResponse {
    pub level: u8,
    pub description: String,
    pub delay_minutes: Option<f64>,
    pub captured_at: String,
}

#[derive(Debug, Serialize)]
pub struct HourTrackingResponse {
    pub id: String,
    pub user_id: String,
    pub schedule_id: Option<String>,
    pub day: String,
    pub clock_in: String,
    pub clock_out: Option<String>,
    pub total_hours: Option<f64>,
    pub location_id: Option<String>,
    pub traffic: Option<TrafficSnapshotResponse>,
    pub status: TrackingStatus,
}

fn to_response(h: HourTracking) -> HourTrackingResponse {
    HourTrackingResponse {
        id: h.id.map(|id| id.to_hex()).unwrap_or_default(),
        user_id: h.user_id.to_hex(),
        schedule_id: h.schedule_id.map(|id| id.to_hex()),
        day: h.day,
        clock_in: h.clock_in.try_to_rfc3339_string().unwrap_or_default(),
        clock_out: h.clock_out.and_then(|t| t.try_to_rfc3339_string().ok()),
        total_hours: h.total_hours,
        location_id: h.location_id.map(|id| id.to_hex()),
        traffic: h.traffic.map(|t| TrafficSnapshotResponse {
            level: t.level,
            description: t.description,
            delay_minutes: t.delay_minutes,
            captured_at: t.captured_at.try_to_rfc3339_string().unwrap_or_default(),
        }),
        status: h.status,
    }
}

async fn traffic_snapshot(state: &AppState, location_id: ObjectId) -> Option<TrafficSnapshot> {
    let location = state.stores.locations.base.find_by_id(location_id).await.ok()?;
    match state.maps.traffic(location.coordinates).await {
        Ok(info) => Some(TrafficSnapshot {
            level: info.level,
            description: info.description,
            delay_minutes: Some(info.delay_minutes),
            captured_at: DateTime::now(),
        }),
        Err(e) => {
            warn!(location = %location_id, error = %e, "Clock-in traffic lookup failed");
            None
        }
    }
}

pub async fn clock_in(
    State(state): State<AppState>,
    auth: AuthUser,
    body: Option<Json<ClockInRequest>>,
) -> Result<(StatusCode, Json<HourTrackingResponse>), ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let schedule_id = body
        .schedule_id
        .as_deref()
        .map(|s| parse_id(s, "schedule_id"))
        .transpose()?;

    let mut location_id = body
        .location_id
        .as_deref()
        .map(|l| parse_id(l, "location_id"))
        .transpose()?;
    if let Some(id) = schedule_id {
        let schedule = state.stores.schedules.base.find_by_id(id).await?;
        if !schedule.is_assigned(&auth.user_id) {
            return Err(ApiError::Forbidden(
                "You are not assigned to this schedule".to_string(),
            ));
        }
        location_id = location_id.or(Some(schedule.location_id));
    }

    let traffic = match location_id {
        Some(id) => traffic_snapshot(&state, id).await,
        None => None,
    };

    let record = state
        .stores
        .hours
        .clock_in(ClockIn {
            user_id: auth.user_id,
            schedule_id,
            day: state.clock.day_key(DateTime::now()),
            location_id,
            traffic,
        })
        .await
        .map_err(|e| match e {
            DaoError::DuplicateKey(_) => {
                ApiError::Conflict("You are already clocked in today".to_string())
            }
            other => other.into(),
        })?;
    info!(user = %auth.user_id, day = %record.day, "Clocked in");

    Ok((StatusCode::CREATED, Json(to_response(record))))
}

pub async fn clock_out(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(record_id): Path<String>,
) -> Result<Json<HourTrackingResponse>, ApiError> {
    let id = parse_id(&record_id, "record_id")?;
    let record = state.stores.hours.clock_out(id, auth.user_id).await?;
    info!(user = %auth.user_id, hours = ?record.total_hours, "Clocked out");
    Ok(Json(to_response(record)))
}

/// Own records, or everyone's for admins.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<HourTrackingResponse>>, ApiError> {
    let owner = if auth.is_admin() {
        None
    } else {
        Some(auth.user_id)
    };
    let records = state.stores.hours.list(owner).await?;
    Ok(Json(records.into_iter().map(to_response).collect()))
}
