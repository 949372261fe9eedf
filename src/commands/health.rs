use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;

use crate::api::CompanionApi;
use crate::error::Result;
use crate::health::{HealthMonitor, HealthStatus};

/// Colored label for a status
pub fn status_label(status: HealthStatus) -> String {
    match status {
        HealthStatus::Online => "online".green().bold().to_string(),
        HealthStatus::Offline => "offline".red().bold().to_string(),
        HealthStatus::Unknown => "unknown".yellow().to_string(),
    }
}

/// Handle `confidant health`
///
/// Without `watch`, runs one probe and prints the result; an offline backend
/// is reported as an error so the exit status reflects it. With `watch`,
/// prints every status change until Ctrl-C.
pub async fn check_health(
    api: Arc<dyn CompanionApi>,
    base_url: &str,
    interval: Duration,
    watch: bool,
) -> Result<()> {
    let monitor = HealthMonitor::new(api);

    if !watch {
        let status = monitor.probe_once().await;
        println!("Backend {} is {}", base_url, status_label(status));
        if status != HealthStatus::Online {
            return Err(crate::error::ConfidantError::HealthCheck(format!(
                "{} is not reachable",
                base_url
            ))
            .into());
        }
        return Ok(());
    }

    println!(
        "Watching {} every {}s (Ctrl-C to stop)",
        base_url,
        interval.as_secs()
    );
    let handle = monitor.start(interval);
    let mut updates = handle.subscribe();

    loop {
        tokio::select! {
            biased;

            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = *updates.borrow_and_update();
                println!(
                    "{} backend is {}",
                    chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
                    status_label(status)
                );
            }
        }
    }

    HealthMonitor::stop(handle).await;
    Ok(())
}
