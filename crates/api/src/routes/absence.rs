use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shiftdesk_db::models::{Absence, AbsenceStatus, AbsenceType};
use shiftdesk_services::dao::NewAbsence;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, parse_id},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAbsenceRequest {
    pub start_date: NaiveDate,
    /// Defaults to `start_date`.
    pub end_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    #[serde(default)]
    pub absence_type: AbsenceType,
    pub schedule_id: Option<String>,
    #[serde(default)]
    pub replacement_needed: bool,
}

#[derive(Debug, Serialize)]
pub struct AbsenceResponse {
    pub id: String,
    pub user_id: String,
    pub schedule_id: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
    pub absence_type: AbsenceType,
    pub status: AbsenceStatus,
    pub replacement_needed: bool,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
}

fn to_response(a: Absence) -> AbsenceResponse {
    AbsenceResponse {
        id: a.id.map(|id| id.to_hex()).unwrap_or_default(),
        user_id: a.user_id.to_hex(),
        schedule_id: a.schedule_id.map(|id| id.to_hex()),
        start_date: a.start_date.try_to_rfc3339_string().unwrap_or_default(),
        end_date: a.end_date.try_to_rfc3339_string().unwrap_or_default(),
        reason: a.reason,
        absence_type: a.absence_type,
        status: a.status,
        replacement_needed: a.replacement_needed,
        reviewed_by: a.reviewed_by.map(|id| id.to_hex()),
        reviewed_at: a.reviewed_at.and_then(|t| t.try_to_rfc3339_string().ok()),
        created_at: a.created_at.try_to_rfc3339_string().unwrap_or_default(),
    }
}

/// Own absences, or every absence for admins.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<AbsenceResponse>>, ApiError> {
    let owner = if auth.is_admin() {
        None
    } else {
        Some(auth.user_id)
    };
    let absences = state.stores.absences.list(owner).await?;
    Ok(Json(absences.into_iter().map(to_response).collect()))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateAbsenceRequest>,
) -> Result<(StatusCode, Json<AbsenceResponse>), ApiError> {
    body.validate()?;
    let end = body.end_date.unwrap_or(body.start_date);
    if end < body.start_date {
        return Err(ApiError::Validation(
            "end_date must not be before start_date".to_string(),
        ));
    }
    let schedule_id = body
        .schedule_id
        .as_deref()
        .map(|s| parse_id(s, "schedule_id"))
        .transpose()?;

    let requester = auth.load(&state).await?;
    let absence = state
        .absences
        .request(
            &requester,
            NewAbsence {
                user_id: auth.user_id,
                schedule_id,
                start_date: state.clock.start_of_day(body.start_date),
                end_date: state.clock.start_of_day(end),
                reason: body.reason.trim().to_string(),
                absence_type: body.absence_type,
                replacement_needed: body.replacement_needed,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(to_response(absence))))
}

pub async fn approve(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(absence_id): Path<String>,
) -> Result<Json<AbsenceResponse>, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&absence_id, "absence_id")?;
    let reviewer = auth.load(&state).await?;
    let absence = state.absences.approve(id, &reviewer).await?;
    Ok(Json(to_response(absence)))
}

pub async fn reject(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(absence_id): Path<String>,
) -> Result<Json<AbsenceResponse>, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&absence_id, "absence_id")?;
    let reviewer = auth.load(&state).await?;
    let absence = state.absences.reject(id, &reviewer).await?;
    Ok(Json(to_response(absence)))
}

pub async fn complete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(absence_id): Path<String>,
) -> Result<Json<AbsenceResponse>, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&absence_id, "absence_id")?;
    let reviewer = auth.load(&state).await?;
    let absence = state.absences.complete(id, &reviewer).await?;
    Ok(Json(to_response(absence)))
}
