use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use bson::Document;
use serde::{Deserialize, Serialize};
use shiftdesk_db::models::{Address, GeoPoint, Location};
use validator::Validate;

use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, parse_id},
    state::AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub address: Address,
    pub coordinates: GeoPoint,
    pub team_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLocationRequest {
    pub name: Option<String>,
    pub address: Option<Address>,
    pub coordinates: Option<GeoPoint>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub id: String,
    pub name: String,
    pub address: Address,
    pub coordinates: GeoPoint,
    pub is_active: bool,
    pub team_id: Option<String>,
}

fn to_response(location: Location) -> LocationResponse {
    LocationResponse {
        id: location.id.map(|id| id.to_hex()).unwrap_or_default(),
        name: location.name,
        address: location.address,
        coordinates: location.coordinates,
        is_active: location.is_active,
        team_id: location.team_id.map(|id| id.to_hex()),
    }
}

fn check_coordinates(point: &GeoPoint) -> Result<(), ApiError> {
    if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lon) {
        return Err(ApiError::Validation("Coordinates out of range".to_string()));
    }
    Ok(())
}

pub async fn list(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<LocationResponse>>, ApiError> {
    let locations = state.stores.locations.list(None).await?;
    Ok(Json(locations.into_iter().map(to_response).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(location_id): Path<String>,
) -> Result<Json<LocationResponse>, ApiError> {
    let id = parse_id(&location_id, "location_id")?;
    let location = state.stores.locations.base.find_by_id(id).await?;
    Ok(Json(to_response(location)))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateLocationRequest>,
) -> Result<(StatusCode, Json<LocationResponse>), ApiError> {
    auth.require_admin()?;
    body.validate()?;
    check_coordinates(&body.coordinates)?;

    let team_id = match body.team_id.as_deref() {
        Some(team) => Some(parse_id(team, "team_id")?),
        None => auth.load(&state).await?.team_id,
    };
    let location = state
        .stores
        .locations
        .create(body.name, body.address, body.coordinates, team_id)
        .await?;
    Ok((StatusCode::CREATED, Json(to_response(location))))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(location_id): Path<String>,
    Json(body): Json<UpdateLocationRequest>,
) -> Result<Json<LocationResponse>, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&location_id, "location_id")?;

    let mut set = Document::new();
    if let Some(name) = body.name {
        set.insert("name", name);
    }
    if let Some(address) = body.address {
        set.insert(
            "address",
            bson::to_bson(&address).map_err(|e| ApiError::Internal(e.to_string()))?,
        );
    }
    if let Some(coordinates) = body.coordinates {
        check_coordinates(&coordinates)?;
        set.insert(
            "coordinates",
            bson::to_bson(&coordinates).map_err(|e| ApiError::Internal(e.to_string()))?,
        );
    }
    if let Some(active) = body.is_active {
        set.insert("is_active", active);
    }

    let location = if set.is_empty() {
        state.stores.locations.base.find_by_id(id).await?
    } else {
        state.stores.locations.update(id, set).await?
    };
    Ok(Json(to_response(location)))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(location_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    auth.require_admin()?;
    let id = parse_id(&location_id, "location_id")?;
    if !state.stores.locations.base.delete_by_id(id).await? {
        return Err(ApiError::NotFound("Location not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}
