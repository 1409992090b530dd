use std::collections::BTreeMap;

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use bson::DateTime;
use serde::{Deserialize, Serialize};
use shiftdesk_db::models::{TemplateDefinition, WhatsAppSettings};
use shiftdesk_services::whatsapp::{parse_event, verify_signature, verify_subscription};
use tracing::{debug, info, warn};

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub enabled: Option<bool>,
    pub auto_reply: Option<bool>,
    pub ai_processing: Option<bool>,
    pub max_response_length: Option<u32>,
    pub welcome_message: Option<String>,
    pub system_instructions: Option<String>,
    pub templates: Option<BTreeMap<String, TemplateDefinition>>,
    pub legacy_templates: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    pub enabled: bool,
    pub auto_reply: bool,
    pub ai_processing: bool,
    pub max_response_length: u32,
    pub welcome_message: String,
    pub system_instructions: String,
    pub templates: BTreeMap<String, TemplateDefinition>,
    pub legacy_templates: BTreeMap<String, String>,
    pub updated_at: String,
}

fn to_response(s: &WhatsAppSettings) -> SettingsResponse {
    SettingsResponse {
        enabled: s.enabled,
        auto_reply: s.auto_reply,
        ai_processing: s.ai_processing,
        max_response_length: s.max_response_length,
        welcome_message: s.welcome_message.clone(),
        system_instructions: s.system_instructions.clone(),
        templates: s.templates.clone(),
        legacy_templates: s.legacy_templates.clone(),
        updated_at: s.updated_at.try_to_rfc3339_string().unwrap_or_default(),
    }
}

pub async fn get_settings(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<SettingsResponse>, ApiError> {
    auth.require_admin()?;
    let settings = state.registry.refresh().await?;
    Ok(Json(to_response(&settings)))
}

pub async fn update_settings(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    auth.require_admin()?;
    if body.max_response_length == Some(0) {
        return Err(ApiError::Validation(
            "max_response_length must be positive".to_string(),
        ));
    }

    let mut settings = WhatsAppSettings::clone(&*state.registry.refresh().await?);
    if let Some(v) = body.enabled {
        settings.enabled = v;
    }
    if let Some(v) = body.auto_reply {
        settings.auto_reply = v;
    }
    if let Some(v) = body.ai_processing {
        settings.ai_processing = v;
    }
    if let Some(v) = body.max_response_length {
        settings.max_response_length = v;
    }
    if let Some(v) = body.welcome_message {
        settings.welcome_message = v;
    }
    if let Some(v) = body.system_instructions {
        settings.system_instructions = v;
    }
    if let Some(v) = body.templates {
        settings.templates = v;
    }
    if let Some(v) = body.legacy_templates {
        settings.legacy_templates = v;
    }
    settings.updated_at = DateTime::now();

    let stored = state.registry.store(settings).await?;
    info!(admin = %auth.user_id, templates = stored.templates.len(), "WhatsApp settings updated");
    Ok(Json(to_response(&stored)))
}

/// Subscription handshake: echoes `hub.challenge` when the token matches.
pub async fn verify(State(state): State<AppState>, Query(query): Query<VerifyQuery>) -> Response {
    match verify_subscription(
        query.mode.as_deref(),
        query.verify_token.as_deref(),
        query.challenge.as_deref(),
        &state.settings.whatsapp.verify_token,
    ) {
        Some(challenge) => {
            info!("WhatsApp webhook verified");
            (StatusCode::OK, challenge.to_string()).into_response()
        }
        None => {
            warn!(mode = ?query.mode, "WhatsApp webhook verification failed");
            ApiError::Forbidden("Webhook verification failed".to_string()).into_response()
        }
    }
}

/// Event ingest. Acknowledges at once and hands each message to the agent
/// on its own task.
pub async fn receive(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Some(secret) = state
        .settings
        .whatsapp
        .app_secret
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok());
        if !verify_signature(secret, &body, header) {
            warn!("Rejected WhatsApp event with a bad signature");
            return ApiError::Unauthorized("Invalid webhook signature".to_string()).into_response();
        }
    }

    match parse_event(&body) {
        Ok(messages) => {
            debug!(count = messages.len(), "WhatsApp event received");
            for message in messages {
                let agent = state.agent.clone();
                tokio::spawn(async move {
                    agent.handle_inbound(message).await;
                });
            }
        }
        Err(e) => warn!(error = %e, "Unparseable WhatsApp event"),
    }

    (StatusCode::OK, "EVENT_RECEIVED").into_response()
}
