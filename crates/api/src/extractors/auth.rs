use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use bson::oid::ObjectId;
use shiftdesk_db::models::{Role, User};
use shiftdesk_services::auth::Claims;

use crate::{error::ApiError, state::AppState};

pub const AUTH_HEADER: &str = "x-auth-token";

/// Extracts the authenticated user from the `x-auth-token` header, falling
/// back to `Authorization: Bearer`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: ObjectId,
    pub role: Role,
    pub claims: Claims,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Admins may act on anyone; employees only on themselves.
    pub fn require_self_or_admin(&self, user_id: ObjectId) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Access denied".to_string()))
        }
    }

    /// The stored user behind the token.
    pub async fn load(&self, state: &AppState) -> Result<User, ApiError> {
        state
            .stores
            .users
            .base
            .find_one(bson::doc! { "_id": self.user_id })
            .await?
            .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(AUTH_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                parts
                    .headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .map(|s| s.to_string())
            })
            .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".to_string()))?;

        let claims = app_state.auth.verify_token(&token)?;
        let user_id = claims
            .user_id()
            .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;

        Ok(AuthUser {
            user_id,
            role: claims.user.role,
            claims,
        })
    }
}

/// Helper trait for extracting AppState from composite state types
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

impl FromRef<AppState> for AppState {
    fn from_ref(input: &AppState) -> Self {
        input.clone()
    }
}

/// Parses a path id, mapping failure to 400.
pub fn parse_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {what}")))
}

pub fn parse_ids(raw: &[String], what: &str) -> Result<Vec<ObjectId>, ApiError> {
    raw.iter().map(|r| parse_id(r, what)).collect()
}
