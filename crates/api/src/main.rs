use shiftdesk_api::{build_router, jobs, state::AppState};
use shiftdesk_config::Settings;
use shiftdesk_db::{connect, indexes::ensure_indexes};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "shiftdesk_api=debug,shiftdesk_services=debug,shiftdesk_db=debug,shiftdesk_speech=debug,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if settings.app.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let missing = settings.missing_secrets();
    if !missing.is_empty() {
        if settings.app.is_production() {
            anyhow::bail!("missing required secrets: {}", missing.join(", "));
        }
        warn!(missing = ?missing, "Running with empty secrets");
    }

    info!(
        host = %settings.app.host,
        port = settings.app.port,
        mode = %settings.app.mode,
        timezone = %settings.app.timezone,
        "Starting Shiftdesk API"
    );

    let db = connect(&settings).await?;
    ensure_indexes(&db).await?;

    let app_state = AppState::new(db, settings.clone())?;
    let _scheduler = jobs::start(&app_state).await?;

    let app = build_router(app_state);

    let addr = format!("{}:{}", settings.app.host, settings.app.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
