//! Natural-language admin commands.
//!
//! Mapping is a keyword table evaluated in order; argument extraction uses
//! precompiled regexes. Everything but [`execute`] is pure.

use std::sync::LazyLock;

use bson::{DateTime, doc, oid::ObjectId};
use regex::Regex;
use shiftdesk_db::models::{Absence, NotificationChannel, Relation, User};
use tracing::info;

use super::AssistantDeps;
use super::dates::admin_target_date;
use super::handlers::location_names;
use crate::error::{ServiceError, ServiceResult};
use crate::notify::{DispatchReport, DispatchRequest};
use crate::whatsapp::TemplateRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Help,
    Users,
    Schedules,
    Broadcast,
    Notify,
    Status,
    Absences,
    Approve,
    Reject,
}

/// First match wins.
const KEYWORDS: &[(AdminAction, &[&str])] = &[
    (AdminAction::Approve, &["approve"]),
    (AdminAction::Reject, &["reject", "deny", "decline"]),
    (AdminAction::Broadcast, BROADCAST_INDICATORS),
    (AdminAction::Notify, &["notify", "message to", "tell "]),
    (AdminAction::Absences, &["absence", "leave request", "time off"]),
    (AdminAction::Schedules, &["schedule", "shift"]),
    (AdminAction::Users, &["user", "employee", "staff"]),
    (AdminAction::Status, &["status", "stats"]),
    (AdminAction::Help, &["help", "commands", "what can you do"]),
];

const BROADCAST_INDICATORS: &[&str] = &[
    "broadcast",
    "announce",
    "send to all",
    "message everyone",
    "tell everyone",
];

pub const HELP_TEXT: &str = "Admin commands:\n\
- users: list all users\n\
- schedules [today|tomorrow|yesterday|next week|next <weekday>]: list shifts for a day\n\
- broadcast <message>: send a WhatsApp message to everyone\n\
- notify <user> about <message>: message one user (also \"tell <user> that ...\")\n\
- status: system counters\n\
- absences: pending absence requests\n\
- approve|reject [absence id | for <name>]: decide an absence request";

static ABSENCE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[0-9a-fA-F]{24}\b").expect("valid regex"));
static NOTIFY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?is)\bnotify\s+(.+?)\s+about\s+(.+)",
        r"(?is)\bmessage\s+to\s+([^:]+?)\s*:\s*(.+)",
        r"(?is)\btell\s+(.+?)\s+that\s+(.+)",
        r"(?is)\bnotify\s+(\S+)\s+(.+)",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});
static NAME_AFTER_PREPOSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:for|of|from)\s+([a-z][a-z.'\- ]*?)\s*[.!?]?\s*$").expect("valid regex")
});
static POSSESSIVE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:approve|reject|deny|decline)\s+([a-z][a-z\-]*(?:\s+[a-z][a-z\-]*)?)'s\b")
        .expect("valid regex")
});

pub fn map_action(utterance: &str) -> AdminAction {
    let lowered = utterance.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(action, _)| *action)
        .unwrap_or(AdminAction::Help)
}

/// Broadcast body: the text after the first indicator found, in table order.
pub fn strip_broadcast_prefix(utterance: &str) -> String {
    let lowered = utterance.to_lowercase();
    for indicator in BROADCAST_INDICATORS {
        if let Some(start) = lowered.find(indicator) {
            // Lowercasing can shift byte offsets for non-ASCII text.
            let end = start + indicator.len();
            if let Some(rest) = utterance.get(end..) {
                return rest
                    .trim_start_matches(|c: char| c.is_whitespace() || c == ':' || c == '-')
                    .trim()
                    .to_string();
            }
        }
    }
    utterance.trim().to_string()
}

/// `(target, message)` of a notify command.
pub fn parse_notify(utterance: &str) -> Option<(String, String)> {
    NOTIFY_PATTERNS.iter().find_map(|pattern| {
        let captures = pattern.captures(utterance)?;
        let target = captures[1].trim().trim_matches(['"', '\'']).to_string();
        let message = captures[2].trim().to_string();
        (!target.is_empty() && !message.is_empty()).then_some((target, message))
    })
}

pub fn extract_absence_id(utterance: &str) -> Option<ObjectId> {
    ABSENCE_ID
        .find(utterance)
        .and_then(|m| ObjectId::parse_str(m.as_str()).ok())
}

/// Requester name in "approve absence for Jane Doe" or "reject Jane's leave".
pub fn extract_requester_name(utterance: &str) -> Option<String> {
    let captured = POSSESSIVE_NAME
        .captures(utterance)
        .or_else(|| NAME_AFTER_PREPOSITION.captures(utterance))?;
    let name = captured[1].trim();
    let lowered = name.to_lowercase();
    if name.is_empty() || ["the", "this", "that", "me", "today", "tomorrow"].contains(&lowered.as_str())
    {
        return None;
    }
    Some(name.to_string())
}

/// Runs an admin command. The caller must already be known to be an admin.
pub async fn execute(deps: &AssistantDeps, admin: &User, utterance: &str) -> ServiceResult<String> {
    if !admin.is_admin() {
        return Err(ServiceError::Forbidden("admin role required".to_string()));
    }
    let action = map_action(utterance);
    info!(admin = ?admin.id, ?action, "Admin command");

    match action {
        AdminAction::Help => Ok(HELP_TEXT.to_string()),
        AdminAction::Users => list_users(deps).await,
        AdminAction::Schedules => list_schedules(deps, utterance).await,
        AdminAction::Broadcast => broadcast(deps, admin, utterance).await,
        AdminAction::Notify => notify(deps, admin, utterance).await,
        AdminAction::Status => status(deps).await,
        AdminAction::Absences => pending_absences(deps).await,
        AdminAction::Approve => decide(deps, admin, utterance, true).await,
        AdminAction::Reject => decide(deps, admin, utterance, false).await,
    }
}

async fn list_users(deps: &AssistantDeps) -> ServiceResult<String> {
    let users = deps.stores.users.list_all().await?;
    if users.is_empty() {
        return Ok("No users found.".to_string());
    }
    let mut lines = vec![format!("Users ({}):", users.len())];
    for user in &users {
        lines.push(format!(
            "- {} [{}] role: {}, department: {}, phone: {}",
            user.name,
            user.id.map(|id| id.to_hex()).unwrap_or_default(),
            user.role.as_str(),
            user.department.as_deref().unwrap_or("-"),
            user.phone.as_deref().unwrap_or("-"),
        ));
    }
    Ok(lines.join("\n"))
}

async fn list_schedules(deps: &AssistantDeps, utterance: &str) -> ServiceResult<String> {
    let date = admin_target_date(utterance, deps.clock.today());
    let (from, until) = deps.clock.day_range(date);
    let schedules = deps.stores.schedules.find_between(from, until).await?;
    let day = date.format("%a %d %b %Y");
    if schedules.is_empty() {
        return Ok(format!("No schedules on {day}."));
    }

    let names = location_names(deps, &schedules).await?;
    let mut lines = vec![format!("Schedules on {day}:")];
    for schedule in &schedules {
        lines.push(format!(
            "- {}-{} {} at {} ({} assigned)",
            deps.clock.format_time(schedule.start_time),
            deps.clock.format_time(schedule.end_time),
            schedule.title,
            names
                .get(&schedule.location_id)
                .map(String::as_str)
                .unwrap_or("unknown location"),
            schedule.employees.len()
        ));
    }
    Ok(lines.join("\n"))
}

fn announcement(
    recipients: Vec<User>,
    admin: &User,
    message: &str,
    relation: Relation,
) -> DispatchRequest {
    DispatchRequest {
        recipients,
        channel: NotificationChannel::Whatsapp,
        subject: "Announcement".to_string(),
        content: message.to_string(),
        relation,
        related_id: None,
        created_by: admin.id,
        template: Some(TemplateRequest::new("general_announcement_update").slot("message", message)),
    }
}

async fn broadcast(deps: &AssistantDeps, admin: &User, utterance: &str) -> ServiceResult<String> {
    let message = strip_broadcast_prefix(utterance);
    if message.is_empty() {
        return Ok("Please include the message to broadcast, e.g. \"broadcast Plant closed Friday\".".to_string());
    }
    let recipients = deps.stores.users.find_with_phone().await?;
    let report: DispatchReport = deps
        .dispatcher
        .dispatch(announcement(recipients, admin, &message, Relation::Announcement))
        .await;
    Ok(format!("Broadcast message sent to {} users.", report.sent))
}

async fn resolve_user(deps: &AssistantDeps, target: &str) -> ServiceResult<Option<User>> {
    if let Ok(id) = ObjectId::parse_str(target) {
        if let Some(user) = deps.stores.users.base.find_one(doc! { "_id": id }).await? {
            return Ok(Some(user));
        }
    }
    if target.chars().filter(char::is_ascii_digit).count() >= 4 {
        if let Some(user) = deps.stores.users.find_by_phone_fragment(target).await? {
            return Ok(Some(user));
        }
    }
    Ok(deps.stores.users.find_by_name(target).await?)
}

async fn notify(deps: &AssistantDeps, admin: &User, utterance: &str) -> ServiceResult<String> {
    let Some((target, message)) = parse_notify(utterance) else {
        return Ok("Use: notify <user> about <message>.".to_string());
    };
    let Some(user) = resolve_user(deps, &target).await? else {
        return Ok(format!("User \"{target}\" not found."));
    };
    let name = user.name.clone();
    let report = deps
        .dispatcher
        .dispatch(announcement(vec![user], admin, &message, Relation::Other))
        .await;
    if report.sent > 0 {
        Ok(format!("Message sent to {name}."))
    } else {
        Ok(format!("Could not deliver the message to {name}."))
    }
}

async fn status(deps: &AssistantDeps) -> ServiceResult<String> {
    let users = deps.stores.users.base.count(doc! {}).await?;
    let schedules = deps.stores.schedules.base.count(doc! {}).await?;
    let locations = deps.stores.locations.base.count(doc! {}).await?;
    let conversations = deps.stores.conversations.count_active().await?;
    let now = DateTime::now();
    Ok(format!(
        "System status:\n- Users: {users}\n- Schedules: {schedules}\n- Locations: {locations}\n- Active conversations: {conversations}\nTime: {} {}",
        deps.clock.format_date(now),
        deps.clock.format_time(now),
    ))
}

async fn pending_absences(deps: &AssistantDeps) -> ServiceResult<String> {
    let pending = deps.stores.absences.list_pending().await?;
    if pending.is_empty() {
        return Ok("There are no pending absence requests.".to_string());
    }
    let mut lines = vec![format!("Pending absences ({}):", pending.len())];
    for absence in &pending {
        let requester = deps
            .stores
            .users
            .base
            .find_one(doc! { "_id": absence.user_id })
            .await?
            .map(|u| u.name)
            .unwrap_or_else(|| "unknown user".to_string());
        lines.push(format!(
            "- [{}] {requester}: {} {} to {} ({})",
            absence.id.map(|id| id.to_hex()).unwrap_or_default(),
            absence.absence_type.as_str(),
            deps.clock.day_key(absence.start_date),
            deps.clock.day_key(absence.end_date),
            absence.reason
        ));
    }
    Ok(lines.join("\n"))
}

/// Absence addressed by id, then by requester name, then the newest pending one.
async fn target_absence(deps: &AssistantDeps, utterance: &str) -> ServiceResult<Option<Absence>> {
    if let Some(id) = extract_absence_id(utterance) {
        return Ok(deps.stores.absences.base.find_one(doc! { "_id": id }).await?);
    }
    if let Some(name) = extract_requester_name(utterance) {
        if let Some(user) = deps.stores.users.find_by_name(&name).await? {
            return Ok(deps.stores.absences.latest_pending(user.id).await?);
        }
    }
    Ok(deps.stores.absences.latest_pending(None).await?)
}

async fn decide(
    deps: &AssistantDeps,
    admin: &User,
    utterance: &str,
    approve: bool,
) -> ServiceResult<String> {
    let Some(absence) = target_absence(deps, utterance).await? else {
        return Ok("No matching pending absence request found.".to_string());
    };
    let Some(id) = absence.id else {
        return Err(ServiceError::Internal("absence without id".to_string()));
    };

    let outcome = if approve {
        deps.absences.approve(id, admin).await
    } else {
        deps.absences.reject(id, admin).await
    };
    match outcome {
        Ok(updated) => Ok(format!(
            "Absence {} is now {}. The employee has been notified.",
            id.to_hex(),
            updated.status.as_str()
        )),
        Err(ServiceError::Validation(msg)) => Ok(msg),
        Err(e) => Err(e),
    }
}
