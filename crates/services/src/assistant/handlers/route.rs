use bson::oid::ObjectId;
use serde_json::json;
use shiftdesk_db::models::{Conversation, Location, User};
use tracing::warn;

use super::{find_location, first_shift_today};
use crate::assistant::{AssistantDeps, Reply};
use crate::error::ServiceResult;
use crate::providers::RouteOption;

pub fn format_routes(destination: &str, routes: &[RouteOption]) -> String {
    let mut lines = vec![format!("Routes to {destination}:")];
    for (index, route) in routes.iter().enumerate() {
        let mut line = format!(
            "{}. {:.1} km, {:.0} min",
            index + 1,
            route.distance_km,
            route.travel_minutes
        );
        if route.traffic_delay_minutes > 0.0 {
            line.push_str(&format!(
                " (+{:.0} min traffic)",
                route.traffic_delay_minutes
            ));
        }
        lines.push(line);
    }
    lines.join("\n")
}

async fn destination(
    deps: &AssistantDeps,
    user: &User,
    conversation: &Conversation,
) -> ServiceResult<Option<Location>> {
    if let Some(id) = conversation
        .context_str("currentLocation")
        .and_then(|hex| ObjectId::parse_str(hex).ok())
    {
        if let Some(location) = find_location(deps, id).await? {
            return Ok(Some(location));
        }
    }
    Ok(first_shift_today(deps, user)
        .await?
        .map(|(_, location)| location))
}

pub async fn handle(
    deps: &AssistantDeps,
    user: &User,
    conversation: &Conversation,
) -> ServiceResult<Reply> {
    let Some(destination) = destination(deps, user, conversation).await? else {
        return Ok(Reply::text(
            "I couldn't work out where you're heading. Ask me about today's traffic or your schedule first.",
        ));
    };
    let location_slot = destination.id.map(|id| json!(id.to_hex())).unwrap_or_default();

    let origin = match user.default_location_id {
        Some(id) => find_location(deps, id).await?,
        None => None,
    };
    let Some(origin) = origin else {
        return Ok(Reply::text(format!(
            "Set a default starting location in your profile and I'll plan routes to {}.",
            destination.name
        ))
        .with_slot("currentLocation", location_slot));
    };

    let max = deps.settings.max_route_options.max(1);
    match deps
        .maps
        .routes(origin.coordinates, destination.coordinates, max)
        .await
    {
        Ok(routes) if !routes.is_empty() => {
            let routes: Vec<RouteOption> = routes.into_iter().take(max).collect();
            Ok(Reply::text(format_routes(&destination.name, &routes))
                .with_slot("currentLocation", location_slot)
                .with_slot("routeData", serde_json::to_value(&routes).unwrap_or_default()))
        }
        Ok(_) => Ok(Reply::text(format!(
            "I couldn't find a route to {} right now.",
            destination.name
        ))
        .with_slot("currentLocation", location_slot)),
        Err(e) => {
            warn!(destination = %destination.name, error = %e, "Route lookup failed");
            Ok(Reply::text(format!(
                "I couldn't get route information to {} right now. Please try again later.",
                destination.name
            ))
            .with_slot("currentLocation", location_slot))
        }
    }
}
