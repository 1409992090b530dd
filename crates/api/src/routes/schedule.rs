use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::{DateTime, Document, oid::ObjectId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shiftdesk_db::models::{Relation, Schedule, ScheduleNotificationPrefs, ScheduleStatus};
use shiftdesk_services::{DispatchRequest, dao::NewSchedule, whatsapp::TemplateRequest};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, parse_id, parse_ids},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub start_time: chrono::DateTime<Utc>,
    pub end_time: chrono::DateTime<Utc>,
    pub location_id: String,
    #[serde(default)]
    pub employees: Vec<String>,
    #[serde(default)]
    pub allow_auto_replacement: bool,
    #[serde(default)]
    pub notification_preferences: ScheduleNotificationPrefs,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
    pub title: Option<String>,
    pub start_time: Option<chrono::DateTime<Utc>>,
    pub end_time: Option<chrono::DateTime<Utc>>,
    pub location_id: Option<String>,
    pub employees: Option<Vec<String>>,
    pub status: Option<ScheduleStatus>,
    pub allow_auto_replacement: Option<bool>,
    pub notification_preferences: Option<ScheduleNotificationPrefs>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResponse {
    pub id: String,
    pub title: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub location_id: String,
    pub employees: Vec<String>,
    pub status: ScheduleStatus,
    pub allow_auto_replacement: bool,
    pub notification_preferences: ScheduleNotificationPrefs,
    pub team_id: Option<String>,
    pub created_by: String,
    pub notes: Option<String>,
}

pub(crate) fn to_response(s: Schedule) -> ScheduleResponse {
    ScheduleResponse {
        id: s.id.map(|id| id.to_hex()).unwrap_or_default(),
        title: s.title,
        date: s.date.try_to_rfc3339_string().unwrap_or_default(),
        start_time: s.start_time.try_to_rfc3339_string().unwrap_or_default(),
        end_time: s.end_time.try_to_rfc3339_string().unwrap_or_default(),
        location_id: s.location_id.to_hex(),
        employees: s.employees.iter().map(|id| id.to_hex()).collect(),
        status: s.status,
        allow_auto_replacement: s.allow_auto_replacement,
        notification_preferences: s.notification_preferences,
        team_id: s.team_id.map(|id| id.to_hex()),
        created_by: s.created_by.to_hex(),
        notes: s.notes,
    }
}

/// Loads a schedule the caller may see; employees only see their own.
async fn visible_schedule(
    state: &AppState,
    auth: &AuthUser,
    id: ObjectId,
) -> Result<Schedule, ApiError> {
    let schedule = state.stores.schedules.base.find_by_id(id).await?;
    if !auth.is_admin() && !schedule.is_assigned(&auth.user_id) {
        return Err(ApiError::Forbidden(
            "You are not assigned to this schedule".to_string(),
        ));
    }
    Ok(schedule)
}

/// Tells the assigned employees about a new or changed shift.
async fn announce(state: &AppState, schedule: &Schedule, template: &str, created_by: ObjectId) {
    if schedule.employees.is_empty() {
        return;
    }
    let recipients = match state.stores.users.find_by_ids(&schedule.employees).await {
        Ok(users) => users,
        Err(e) => {
            warn!(schedule = ?schedule.id, error = %e, "Could not load schedule recipients");
            return;
        }
    };
    let location = match state.stores.locations.base.find_by_id(schedule.location_id).await {
        Ok(location) => location.name,
        Err(_) => "unknown location".to_string(),
    };
    let date = state.clock.format_date(schedule.start_time);
    let start = state.clock.format_time(schedule.start_time);
    let end = state.clock.format_time(schedule.end_time);

    let (subject, content) = if template == "schedule_change" {
        (
            format!("Schedule updated: {}", schedule.title),
            format!(
                "Your shift \"{}\" has changed. It is now on {date} from {start} to {end} at {location}.",
                schedule.title
            ),
        )
    } else {
        (
            format!("New schedule: {}", schedule.title),
            format!(
                "You have been scheduled for \"{}\" on {date} from {start} to {end} at {location}.",
                schedule.title
            ),
        )
    };

    let report = state
        .dispatcher
        .dispatch(DispatchRequest {
            recipients,
            channel: schedule.notification_preferences.channel,
            subject,
            content,
            relation: Relation::Schedule,
            related_id: schedule.id,
            created_by: Some(created_by),
            template: Some(
                TemplateRequest::new(template)
                    .slot("title", schedule.title.clone())
                    .slot("date", date)
                    .slot("start_time", start)
                    .slot("location", location),
            ),
        })
        .await;
    info!(
        schedule = ?schedule.id,
        template,
        sent = report.sent,
        failed = report.failed,
        "Schedule notifications dispatched"
    );
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ScheduleResponse>>, ApiError> {
    let employee = if auth.is_admin() {
        None
    } else {
        Some(auth.user_id)
    };
    let schedules = state.stores.schedules.list(employee).await?;
    Ok(Json(schedules.into_iter().map(to_response).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(schedule_id): Path<String>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    let id = parse_id(&schedule_id, "schedule_id")?;
    let schedule = visible_schedule(&state, &auth, id).await?;
    Ok(Json(to_response(schedule)))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ScheduleResponse>), ApiError> {
    auth.require_admin()?;
    body.validate()?;

    let location_id = parse_id(&body.location_id, "location_id")?;
    state.stores.locations.base.find_by_id(location_id).await?;
    let employees = parse_ids(&body.employees, "employees")?;
    let admin = auth.load(&state).await?;

    let start_time = DateTime::from_chrono(body.start_time);
    let date = state.clock.start_of_day(state.clock.local_date(start_time));
    let schedule = state
        .stores
        .schedules
        .create(NewSchedule {
            title: body.title,
            date,
            start_time,
            end_time: DateTime::from_chrono(body.end_time),
            location_id,
            employees,
            allow_auto_replacement: body.allow_auto_replacement,
            notification_preferences: body.notification_preferences,
            team_id: admin.team_id,
            created_by: auth.user_id,
            notes: body.notes,
        })
        .await?;
    info!(schedule = ?schedule.id, employees = schedule.employees.len(), "Schedule created");

    announce(&state, &schedule, "schedule_reminder", auth.user_id).await;
    Ok((StatusCode::CREATED, Json(to_response(schedule))))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(schedule_id): Path<String>,
    Json(body): Json<UpdateScheduleRequest>,
) -> Result<Json<ScheduleResponse>, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&schedule_id, "schedule_id")?;
    let current = state.stores.schedules.base.find_by_id(id).await?;

    let start = body
        .start_time
        .map(DateTime::from_chrono)
        .unwrap_or(current.start_time);
    let end = body
        .end_time
        .map(DateTime::from_chrono)
        .unwrap_or(current.end_time);
    if end <= start {
        return Err(ApiError::Validation(
            "end_time must be after start_time".to_string(),
        ));
    }

    let mut set = Document::new();
    if let Some(title) = body.title {
        set.insert("title", title);
    }
    if body.start_time.is_some() {
        set.insert("start_time", start);
        set.insert("date", state.clock.start_of_day(state.clock.local_date(start)));
    }
    if body.end_time.is_some() {
        set.insert("end_time", end);
    }
    if let Some(location) = body.location_id {
        let location_id = parse_id(&location, "location_id")?;
        state.stores.locations.base.find_by_id(location_id).await?;
        set.insert("location_id", location_id);
    }
    if let Some(employees) = body.employees {
        let mut ids = parse_ids(&employees, "employees")?;
        ids.sort();
        ids.dedup();
        set.insert("employees", ids);
    }
    if let Some(status) = body.status {
        set.insert(
            "status",
            bson::to_bson(&status).map_err(|e| ApiError::Internal(e.to_string()))?,
        );
    }
    if let Some(allow) = body.allow_auto_replacement {
        set.insert("allow_auto_replacement", allow);
    }
    if let Some(prefs) = body.notification_preferences {
        set.insert(
            "notification_preferences",
            bson::to_bson(&prefs).map_err(|e| ApiError::Internal(e.to_string()))?,
        );
    }
    if let Some(notes) = body.notes {
        set.insert("notes", notes);
    }
    if set.is_empty() {
        return Ok(Json(to_response(current)));
    }
    set.insert("updated_at", DateTime::now());

    let schedule = state.stores.schedules.update(id, set).await?;
    announce(&state, &schedule, "schedule_change", auth.user_id).await;
    Ok(Json(to_response(schedule)))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(schedule_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&schedule_id, "schedule_id")?;
    if !state.stores.schedules.base.delete_by_id(id).await? {
        return Err(ApiError::NotFound("Schedule not found".to_string()));
    }
    info!(schedule = %id, "Schedule deleted");
    Ok(StatusCode::NO_CONTENT)
}
