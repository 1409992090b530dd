use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::Document;
use serde::{Deserialize, Serialize};
use shiftdesk_db::models::{NotificationPrefs, Role, User, normalize_phone};
use shiftdesk_services::dao::NewUser;
use tracing::info;
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, parse_id},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub preferred_language: Option<String>,
    /// Joins an existing team when present.
    pub join_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Role,
    pub team_id: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub preferred_language: Option<String>,
    pub notification_preferences: Option<NotificationPrefs>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub preferred_language: Option<String>,
    pub notification_preferences: Option<NotificationPrefs>,
    pub default_location_id: Option<String>,
    /// Admin only.
    pub role: Option<Role>,
    /// Admin only.
    pub team_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub team_id: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub notification_preferences: NotificationPrefs,
    pub default_location_id: Option<String>,
    pub preferred_language: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: UserResponse,
}

pub fn to_response(user: User) -> UserResponse {
    UserResponse {
        id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
        name: user.name,
        email: user.email,
        phone: user.phone,
        role: user.role,
        team_id: user.team_id.map(|id| id.to_hex()),
        position: user.position,
        department: user.department,
        notification_preferences: user.notification_preferences,
        default_location_id: user.default_location_id.map(|id| id.to_hex()),
        preferred_language: user.preferred_language,
    }
}

pub(crate) fn token_response(state: &AppState, user: User) -> Result<TokenResponse, ApiError> {
    let id = user
        .id
        .ok_or_else(|| ApiError::Internal("user without id".to_string()))?;
    let token = state.auth.issue_token(id, user.role)?;
    Ok(TokenResponse {
        token,
        user: to_response(user),
    })
}

fn checked_phone(raw: Option<String>) -> Result<Option<String>, ApiError> {
    match raw.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(None),
        Some(phone) => normalize_phone(phone)
            .map(Some)
            .ok_or_else(|| ApiError::Validation(format!("Invalid phone number: {phone}"))),
    }
}

/// Public self-registration, optionally joining a team by code.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    body.validate()?;

    let team_id = match body.join_code.as_deref().filter(|c| !c.trim().is_empty()) {
        Some(code) => {
            let team = state
                .stores
                .teams
                .find_by_join_code(code)
                .await
                .map_err(|_| ApiError::Validation("Invalid join code".to_string()))?;
            team.id
        }
        None => None,
    };

    let password_hash = state.auth.hash_password(&body.password)?;
    let user = state
        .stores
        .users
        .create(NewUser {
            name: body.name,
            email: body.email,
            password_hash,
            phone: checked_phone(body.phone)?,
            role: Role::Employee,
            team_id,
            position: body.position,
            department: body.department,
            preferred_language: body.preferred_language,
            notification_preferences: None,
        })
        .await?;
    info!(user = ?user.id, "User registered");

    Ok((StatusCode::CREATED, Json(token_response(&state, user)?)))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    auth.require_admin()?;
    body.validate()?;

    let team_id = body
        .team_id
        .as_deref()
        .map(|t| parse_id(t, "team_id"))
        .transpose()?;
    let password_hash = state.auth.hash_password(&body.password)?;
    let user = state
        .stores
        .users
        .create(NewUser {
            name: body.name,
            email: body.email,
            password_hash,
            phone: checked_phone(body.phone)?,
            role: body.role,
            team_id,
            position: body.position,
            department: body.department,
            preferred_language: body.preferred_language,
            notification_preferences: body.notification_preferences,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(to_response(user))))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    auth.require_admin()?;
    let users = state.stores.users.list_all().await?;
    Ok(Json(users.into_iter().map(to_response).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&user_id, "user_id")?;
    auth.require_self_or_admin(id)?;
    let user = state.stores.users.base.find_by_id(id).await?;
    Ok(Json(to_response(user)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let id = parse_id(&user_id, "user_id")?;
    auth.require_self_or_admin(id)?;
    if (body.role.is_some() || body.team_id.is_some()) && !auth.is_admin() {
        return Err(ApiError::Forbidden(
            "Only admins can change roles or teams".to_string(),
        ));
    }

    let mut set = Document::new();
    if let Some(name) = body.name {
        set.insert("name", name);
    }
    if body.phone.is_some() {
        set.insert("phone", checked_phone(body.phone)?);
    }
    if let Some(position) = body.position {
        set.insert("position", position);
    }
    if let Some(department) = body.department {
        set.insert("department", department);
    }
    if let Some(language) = body.preferred_language {
        set.insert("preferred_language", language);
    }
    if let Some(prefs) = body.notification_preferences {
        set.insert(
            "notification_preferences",
            bson::to_bson(&prefs).map_err(|e| ApiError::Internal(e.to_string()))?,
        );
    }
    if let Some(location) = body.default_location_id {
        let location_id = parse_id(&location, "default_location_id")?;
        state.stores.locations.base.find_by_id(location_id).await?;
        set.insert("default_location_id", location_id);
    }
    if let Some(role) = body.role {
        set.insert("role", role.as_str());
    }
    if let Some(team) = body.team_id {
        set.insert("team_id", parse_id(&team, "team_id")?);
    }

    let user = if set.is_empty() {
        state.stores.users.base.find_by_id(id).await?
    } else {
        state.stores.users.update(id, set).await?
    };
    Ok(Json(to_response(user)))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&user_id, "user_id")?;
    if id == auth.user_id {
        return Err(ApiError::BadRequest("Admins cannot delete themselves".to_string()));
    }
    if !state.stores.users.base.delete_by_id(id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
