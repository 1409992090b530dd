use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use shiftdesk_db::models::{
    DeliveryResult, Notification, NotificationChannel, NotificationStatus, Relation,
};
use shiftdesk_services::dao::{PaginatedResult, PaginationParams};

use crate::{
    error::ApiError,
    extractors::auth::{AuthUser, parse_id},
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub channel: NotificationChannel,
    pub subject: String,
    pub content: String,
    pub relation: Relation,
    pub related_id: Option<String>,
    pub status: NotificationStatus,
    pub sent_at: Option<String>,
    pub read_at: Option<String>,
    pub deliveries: Vec<DeliveryResult>,
    pub created_at: String,
}

fn to_response(n: Notification) -> NotificationResponse {
    NotificationResponse {
        id: n.id.map(|id| id.to_hex()).unwrap_or_default(),
        channel: n.channel,
        subject: n.subject,
        content: n.content,
        relation: n.relation,
        related_id: n.related_id.map(|id| id.to_hex()),
        status: n.status,
        sent_at: n.sent_at.and_then(|t| t.try_to_rfc3339_string().ok()),
        read_at: n.read_at.and_then(|t| t.try_to_rfc3339_string().ok()),
        deliveries: n.deliveries,
        created_at: n.created_at.try_to_rfc3339_string().unwrap_or_default(),
    }
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> Result<Json<PaginatedResult<NotificationResponse>>, ApiError> {
    let page = state
        .stores
        .notifications
        .list_for_recipient(auth.user_id, &params)
        .await?;
    Ok(Json(PaginatedResult {
        items: page.items.into_iter().map(to_response).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<String>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let id = parse_id(&notification_id, "notification_id")?;
    let notification = state.stores.notifications.base.find_by_id(id).await?;
    if notification.recipient_id != auth.user_id {
        return Err(ApiError::Forbidden("Not your notification".to_string()));
    }
    if notification.status == NotificationStatus::Read {
        return Ok(Json(to_response(notification)));
    }
    if !state
        .stores
        .notifications
        .advance(id, NotificationStatus::Read)
        .await?
    {
        return Err(ApiError::Validation(format!(
            "A {} notification cannot be marked as read",
            notification.status.as_str()
        )));
    }
    let updated = state.stores.notifications.base.find_by_id(id).await?;
    Ok(Json(to_response(updated)))
}
