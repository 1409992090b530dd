use shiftdesk_db::models::User;

use super::{location_names, require_id};
use crate::assistant::dates::ScheduleWindow;
use crate::assistant::{AssistantDeps, Reply};
use crate::error::ServiceResult;

/// Lists the caller's own shifts in the window named by the utterance.
pub async fn handle(deps: &AssistantDeps, user: &User, utterance: &str) -> ServiceResult<Reply> {
    let window = ScheduleWindow::detect(utterance);
    let (first_day, end_day) = window.bounds(deps.clock.today());
    let (from, until) = deps.clock.range(first_day, end_day);

    let schedules = deps
        .stores
        .schedules
        .find_for_user_between(require_id(user)?, from, until)
        .await?;

    if schedules.is_empty() {
        return Ok(Reply::text(format!(
            "You don't have any schedules for {}, {}.",
            window.label(),
            user.name
        )));
    }

    let names = location_names(deps, &schedules).await?;
    let mut lines = vec![format!(
        "Here are your schedules for {}, {}:",
        window.label(),
        user.name
    )];
    for schedule in &schedules {
        let location = names
            .get(&schedule.location_id)
            .map(String::as_str)
            .unwrap_or("unknown location");
        lines.push(format!(
            "- {} {}-{}: {} at {}",
            deps.clock.format_date(schedule.start_time),
            deps.clock.format_time(schedule.start_time),
            deps.clock.format_time(schedule.end_time),
            schedule.title,
            location
        ));
    }
    Ok(Reply::text(lines.join("\n")))
}
