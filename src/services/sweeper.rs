// Background reconciliation: marks overdue pending tasks missed on a fixed
// period so staleness does not depend on anyone loading their list.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::task_service::TaskService;

/// Spawn the sweeper. Returns `None` when `interval_secs` is 0 (disabled).
pub fn spawn_sweeper(tasks: TaskService, interval_secs: u64) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        info!("Background sweeper disabled");
        return None;
    }

    let period = Duration::from_secs(interval_secs);
    info!("Background sweeper running every {:?}", period);

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweep_once(&tasks).await;
        }
    }))
}

/// One pass; errors are logged and retried on the next tick.
pub async fn sweep_once(tasks: &TaskService) -> u64 {
    match tasks.sweep().await {
        Ok(0) => {
            debug!("sweep found no overdue tasks");
            0
        }
        Ok(count) => {
            info!(count, today = %tasks.today(), "sweep marked overdue tasks missed");
            count
        }
        Err(e) => {
            warn!(error = %e, "sweep failed");
            0
        }
    }
}
