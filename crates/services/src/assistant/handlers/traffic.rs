use serde_json::json;
use shiftdesk_db::models::User;
use tracing::warn;

use super::first_shift_today;
use crate::assistant::{AssistantDeps, Reply};
use crate::error::ServiceResult;

/// Level from which the reply offers alternate routes.
pub const HEAVY_LEVEL: u8 = 3;

pub async fn handle(deps: &AssistantDeps, user: &User) -> ServiceResult<Reply> {
    let Some((schedule, location)) = first_shift_today(deps, user).await? else {
        return Ok(Reply::text(format!(
            "You don't have any shifts today, {}, so there's no commute to check.",
            user.name
        )));
    };
    let location_slot = location.id.map(|id| json!(id.to_hex())).unwrap_or_default();

    let info = match deps.maps.traffic(location.coordinates).await {
        Ok(info) => info,
        Err(e) => {
            warn!(location = %location.name, error = %e, "Traffic lookup failed");
            return Ok(Reply::text(format!(
                "I couldn't get traffic information for {} right now. Please try again in a few minutes.",
                location.name
            ))
            .with_slot("currentLocation", location_slot));
        }
    };

    let mut text = format!(
        "Traffic near {} for your {} shift at {}: {}.",
        location.name,
        schedule.title,
        deps.clock.format_time(schedule.start_time),
        info.description
    );
    if info.delay_minutes > 0.0 {
        text.push_str(&format!(
            " Expect about {:.0} extra minutes.",
            info.delay_minutes
        ));
    }
    if info.level >= HEAVY_LEVEL {
        text.push_str(" Traffic is heavy. Ask me for alternate routes and I'll suggest some.");
    }

    Ok(Reply::text(text).with_slot("currentLocation", location_slot))
}
