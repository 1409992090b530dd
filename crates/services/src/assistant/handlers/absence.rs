use std::sync::LazyLock;

use chrono::Days;
use regex::Regex;
use shiftdesk_db::models::{AbsenceType, User};

use super::require_id;
use crate::assistant::dates::absence_span;
use crate::assistant::{AssistantDeps, Reply};
use crate::dao::NewAbsence;
use crate::error::ServiceResult;

/// Checked in this order; the first indicator present wins.
static REASON_INDICATORS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bbecause\b",
        r"(?i)\bdue to\b",
        r"(?i)\breason is\b",
        r"(?i)\breason:",
        r"(?i)\bfor\b",
        r"(?i)\bas i\b",
        r"(?i)\bsince\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});
static SICK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(sick|ill|illness|unwell|fever)\b").expect("valid regex"));
static VACATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(vacation|holiday|holidays)\b").expect("valid regex"));
static PERSONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bpersonal\b").expect("valid regex"));

/// Text after the first reason indicator, or the whole utterance.
pub fn extract_reason(utterance: &str) -> String {
    for indicator in REASON_INDICATORS.iter() {
        if let Some(m) = indicator.find(utterance) {
            let reason = utterance[m.end()..]
                .trim()
                .trim_end_matches(['.', '!', '?'])
                .trim();
            if !reason.is_empty() {
                return reason.to_string();
            }
        }
    }
    utterance.trim().to_string()
}

pub fn infer_type(utterance: &str) -> AbsenceType {
    if SICK.is_match(utterance) {
        AbsenceType::Sick
    } else if VACATION.is_match(utterance) {
        AbsenceType::Vacation
    } else if PERSONAL.is_match(utterance) {
        AbsenceType::Personal
    } else {
        AbsenceType::Other
    }
}

/// Records a pending absence for the caller and alerts the admins.
pub async fn handle(deps: &AssistantDeps, user: &User, utterance: &str) -> ServiceResult<Reply> {
    let user_id = require_id(user)?;
    let (start, end) = absence_span(utterance, deps.clock.today());
    let from = deps.clock.start_of_day(start);
    let until = deps.clock.start_of_day(end + Days::new(1));

    let schedule = deps
        .stores
        .schedules
        .find_overlapping(user_id, from, until)
        .await?;

    let absence = deps
        .absences
        .request(
            user,
            NewAbsence {
                user_id,
                schedule_id: schedule.as_ref().and_then(|s| s.id),
                start_date: from,
                end_date: deps.clock.start_of_day(end),
                reason: extract_reason(utterance),
                absence_type: infer_type(utterance),
                replacement_needed: schedule
                    .as_ref()
                    .is_some_and(|s| s.allow_auto_replacement),
            },
        )
        .await?;

    let span = if start == end {
        start.format("%Y-%m-%d").to_string()
    } else {
        format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
    };
    let mut text = format!(
        "Thanks {}, your {} absence request for {span} has been submitted and is pending approval.",
        user.name,
        absence.absence_type.as_str()
    );
    if let Some(schedule) = &schedule {
        text.push_str(&format!(" It covers your shift \"{}\".", schedule.title));
    }
    Ok(Reply::text(text))
}
