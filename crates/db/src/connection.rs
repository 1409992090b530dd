use std::time::Duration;

use bson::doc;
use mongodb::{Client, Database, options::ClientOptions};
use shiftdesk_config::Settings;
use tracing::info;

const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens the pool described by `settings.database` and pings the server
/// before handing out the application database.
pub async fn connect(settings: &Settings) -> Result<Database, mongodb::error::Error> {
    let db = &settings.database;
    let mut options = ClientOptions::parse(&db.url).await?;
    options.app_name = Some("shiftdesk".to_string());
    options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
    options.max_pool_size = db.max_pool_size.or(options.max_pool_size);
    options.min_pool_size = db.min_pool_size.or(options.min_pool_size);

    let hosts: Vec<String> = options.hosts.iter().map(|h| h.to_string()).collect();
    let client = Client::with_options(options)?;
    client.database("admin").run_command(doc! { "ping": 1 }).await?;

    info!(hosts = ?hosts, db = %db.name, "Connected to MongoDB");
    Ok(client.database(&db.name))
}
