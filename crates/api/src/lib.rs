pub mod error;
pub mod extractors;
pub mod jobs;
pub mod routes;
pub mod state;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post, put},
};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(parsed))
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.app.cors_origins);

    let auth_routes = Router::new()
        .route("/login", post(routes::auth::login))
        .route("/me", get(routes::auth::me));

    let user_routes = Router::new()
        .route("/", get(routes::user::list).post(routes::user::create))
        .route("/register", post(routes::user::register))
        .route(
            "/{user_id}",
            get(routes::user::get)
                .put(routes::user::update)
                .delete(routes::user::delete),
        );

    let team_routes = Router::new()
        .route("/", get(routes::team::list).post(routes::team::create))
        .route("/join", post(routes::team::join))
        .route("/{team_id}", get(routes::team::get));

    let location_routes = Router::new()
        .route("/", get(routes::location::list).post(routes::location::create))
        .route(
            "/{location_id}",
            get(routes::location::get)
                .put(routes::location::update)
                .delete(routes::location::delete),
        );

    let schedule_routes = Router::new()
        .route("/", get(routes::schedule::list).post(routes::schedule::create))
        .route(
            "/{schedule_id}",
            get(routes::schedule::get)
                .put(routes::schedule::update)
                .delete(routes::schedule::delete),
        );

    let absence_routes = Router::new()
        .route("/", get(routes::absence::list).post(routes::absence::create))
        .route("/{absence_id}/approve", put(routes::absence::approve))
        .route("/{absence_id}/reject", put(routes::absence::reject))
        .route("/{absence_id}/complete", put(routes::absence::complete));

    let hour_routes = Router::new()
        .route("/", get(routes::hour_tracking::list))
        .route("/clock-in", post(routes::hour_tracking::clock_in))
        .route("/clock-out/{record_id}", post(routes::hour_tracking::clock_out));

    let notification_routes = Router::new()
        .route("/", get(routes::notification::list))
        .route("/{notification_id}/read", put(routes::notification::mark_read));

    let whatsapp_routes = Router::new()
        .route(
            "/settings",
            get(routes::whatsapp::get_settings).put(routes::whatsapp::update_settings),
        )
        .route(
            "/webhook",
            get(routes::whatsapp::verify).post(routes::whatsapp::receive),
        );

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/users", user_routes)
        .nest("/teams", team_routes)
        .nest("/locations", location_routes)
        .nest("/schedules", schedule_routes)
        .nest("/absences", absence_routes)
        .nest("/hour-tracking", hour_routes)
        .nest("/notifications", notification_routes)
        .nest("/whatsapp", whatsapp_routes)
        .route("/dashboard/stats", get(routes::dashboard::stats))
        .route("/daily-briefing", get(routes::briefing::daily));

    let health = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api)
        .merge(health)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
