use axum::{Json, extract::State};
use shiftdesk_services::DailyBriefing;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

pub async fn daily(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DailyBriefing>, ApiError> {
    let user = auth.load(&state).await?;
    let briefing = state.briefing.assemble(&user).await?;
    Ok(Json(briefing))
}
