use std::sync::Arc;

use shiftdesk_services::TrafficAlertJob;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::state::AppState;

/// Starts the cron scheduler with the traffic-alert sweep. Returns `None`
/// when the sweep is disabled.
pub async fn start(state: &AppState) -> anyhow::Result<Option<JobScheduler>> {
    let config = &state.settings.traffic_alerts;
    if !config.enabled {
        info!("Traffic alert job disabled");
        return Ok(None);
    }

    let scheduler = JobScheduler::new().await?;
    let job = state.traffic_alerts.clone();
    scheduler
        .add(Job::new_async(config.cron.as_str(), move |_id, _lock| {
            let job = job.clone();
            Box::pin(async move { run_traffic_alerts(job).await })
        })?)
        .await?;
    scheduler.start().await?;
    info!(cron = %config.cron, "Traffic alert job scheduled");
    Ok(Some(scheduler))
}

async fn run_traffic_alerts(job: Arc<TrafficAlertJob>) {
    match job.run().await {
        Ok(report) => info!(?report, "Traffic alert sweep finished"),
        Err(e) => error!(error = %e, "Traffic alert sweep failed"),
    }
}
