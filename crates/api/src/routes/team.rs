use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use shiftdesk_db::models::{Role, Team};
use tracing::info;
use validator::Validate;

use super::user::{UserResponse, to_response as user_response};
use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, parse_id},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub departments: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinTeamRequest {
    pub join_code: String,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub join_code: String,
    pub departments: Vec<String>,
    pub members: Vec<UserResponse>,
}

async fn with_members(state: &AppState, team: Team) -> Result<TeamResponse, ApiError> {
    let members = match team.id {
        Some(id) => state.stores.users.find_by_team(id).await?,
        None => Vec::new(),
    };
    Ok(TeamResponse {
        id: team.id.map(|id| id.to_hex()).unwrap_or_default(),
        name: team.name,
        owner_id: team.owner_id.to_hex(),
        join_code: team.join_code,
        departments: team.departments,
        members: members.into_iter().map(user_response).collect(),
    })
}

/// Creates a team; the creator becomes its owner and an admin.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateTeamRequest>,
) -> Result<(StatusCode, Json<TeamResponse>), ApiError> {
    body.validate()?;
    let team = state
        .stores
        .teams
        .create(body.name, auth.user_id, body.departments)
        .await?;
    let team_id = team
        .id
        .ok_or_else(|| ApiError::Internal("team without id".to_string()))?;
    state
        .stores
        .users
        .set_role_and_team(auth.user_id, Role::Admin, team_id)
        .await?;
    info!(team = %team_id, owner = %auth.user_id, "Team created");

    Ok((StatusCode::CREATED, Json(with_members(&state, team).await?)))
}

/// Admins see every team, employees only their own.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<TeamResponse>>, ApiError> {
    let teams = if auth.is_admin() {
        state.stores.teams.base.find_many(bson::doc! {}, Some(bson::doc! { "name": 1 })).await?
    } else {
        let user = auth.load(&state).await?;
        match user.team_id {
            Some(team_id) => vec![state.stores.teams.base.find_by_id(team_id).await?],
            None => Vec::new(),
        }
    };

    let mut response = Vec::with_capacity(teams.len());
    for team in teams {
        response.push(with_members(&state, team).await?);
    }
    Ok(Json(response))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(team_id): Path<String>,
) -> Result<Json<TeamResponse>, ApiError> {
    let id = parse_id(&team_id, "team_id")?;
    if !auth.is_admin() {
        let user = auth.load(&state).await?;
        if user.team_id != Some(id) {
            return Err(ApiError::Forbidden("Not a member of this team".to_string()));
        }
    }
    let team = state.stores.teams.base.find_by_id(id).await?;
    Ok(Json(with_members(&state, team).await?))
}

pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<JoinTeamRequest>,
) -> Result<Json<TeamResponse>, ApiError> {
    let team = state
        .stores
        .teams
        .find_by_join_code(&body.join_code)
        .await
        .map_err(|_| ApiError::NotFound("No team with that join code".to_string()))?;
    let team_id = team
        .id
        .ok_or_else(|| ApiError::Internal("team without id".to_string()))?;
    state
        .stores
        .users
        .update(auth.user_id, bson::doc! { "team_id": team_id })
        .await?;
    info!(team = %team_id, user = %auth.user_id, "User joined team");

    Ok(Json(with_members(&state, team).await?))
}
