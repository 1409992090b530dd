pub mod absence;
pub mod general;
pub mod route;
pub mod schedule;
pub mod traffic;

use std::collections::HashMap;

use bson::{doc, oid::ObjectId};
use shiftdesk_db::models::{Conversation, Location, Schedule, User};

use super::intent::Intent;
use super::{AssistantDeps, Reply, admin};
use crate::error::{ServiceError, ServiceResult};

pub const ADMIN_ONLY_REPLY: &str =
    "Sorry, admin commands are only available to administrators.";

/// Routes an utterance to the handler for its intent.
pub async fn dispatch(
    intent: Intent,
    deps: &AssistantDeps,
    user: &User,
    conversation: &Conversation,
    utterance: &str,
) -> ServiceResult<Reply> {
    match intent {
        Intent::ScheduleQuery => schedule::handle(deps, user, utterance).await,
        Intent::TrafficQuery => traffic::handle(deps, user).await,
        Intent::RouteQuery => route::handle(deps, user, conversation).await,
        Intent::AbsenceRequest => absence::handle(deps, user, utterance).await,
        Intent::AdminCommand if !user.is_admin() => Ok(Reply::text(ADMIN_ONLY_REPLY)),
        Intent::AdminCommand => admin::execute(deps, user, utterance).await.map(Reply::text),
        Intent::GeneralQuestion => general::handle(deps, user, conversation, utterance).await,
    }
}

pub(crate) fn require_id(user: &User) -> ServiceResult<ObjectId> {
    user.id
        .ok_or_else(|| ServiceError::Internal("user without id".to_string()))
}

/// Display names for the given location ids.
pub(crate) async fn location_names(
    deps: &AssistantDeps,
    schedules: &[Schedule],
) -> ServiceResult<HashMap<ObjectId, String>> {
    let mut ids: Vec<ObjectId> = schedules.iter().map(|s| s.location_id).collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let locations = deps
        .stores
        .locations
        .base
        .find_many(doc! { "_id": { "$in": ids } }, None)
        .await?;
    Ok(locations
        .into_iter()
        .filter_map(|l| l.id.map(|id| (id, l.name)))
        .collect())
}

pub(crate) async fn find_location(
    deps: &AssistantDeps,
    id: ObjectId,
) -> ServiceResult<Option<Location>> {
    Ok(deps.stores.locations.base.find_one(doc! { "_id": id }).await?)
}

/// The user's earliest shift today and its location.
pub(crate) async fn first_shift_today(
    deps: &AssistantDeps,
    user: &User,
) -> ServiceResult<Option<(Schedule, Location)>> {
    let (from, until) = deps.clock.day_range(deps.clock.today());
    let schedules = deps
        .stores
        .schedules
        .find_for_user_between(require_id(user)?, from, until)
        .await?;
    for schedule in schedules {
        if let Some(location) = find_location(deps, schedule.location_id).await? {
            return Ok(Some((schedule, location)));
        }
    }
    Ok(None)
}
