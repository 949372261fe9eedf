//! Backend liveness monitoring
//!
//! A [`HealthMonitor`] probes the backend right away and then on a fixed
//! interval, publishing [`HealthStatus`] through a
//! [`tokio::sync::watch`] channel. Status starts as `Unknown` and only the
//! most recent completed probe decides it afterwards.
//!
//! The polling task is owned by a [`HealthHandle`]. Stopping the handle (or
//! dropping it) cancels the timer and any probe in flight; a probe that
//! completes after cancellation never reaches subscribers.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use metrics::increment_counter;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::CompanionApi;

/// Shortest interval [`HealthMonitor::start`] will poll at
pub const MIN_PROBE_INTERVAL: Duration = Duration::from_millis(10);

/// Backend reachability as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No probe has completed yet
    Unknown,
    /// The last probe returned a success status
    Online,
    /// The last probe failed
    Offline,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "unknown"),
            HealthStatus::Online => write!(f, "online"),
            HealthStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Periodic liveness prober
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use confidant::api::HttpCompanionApi;
/// use confidant::config::Config;
/// use confidant::health::HealthMonitor;
///
/// # async fn example() -> confidant::error::Result<()> {
/// let api = Arc::new(HttpCompanionApi::from_config(&Config::default())?);
/// let monitor = HealthMonitor::new(api);
///
/// let handle = monitor.start(Duration::from_secs(30));
/// let mut updates = handle.subscribe();
/// updates.changed().await?;
/// println!("backend is {}", *updates.borrow());
/// HealthMonitor::stop(handle).await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HealthMonitor {
    api: Arc<dyn CompanionApi>,
}

impl HealthMonitor {
    /// Creates a monitor probing through `api`
    pub fn new(api: Arc<dyn CompanionApi>) -> Self {
        Self { api }
    }

    /// Runs a single probe and reports the resulting status
    pub async fn probe_once(&self) -> HealthStatus {
        probe(self.api.as_ref()).await
    }

    /// Starts polling every `interval`, beginning immediately
    ///
    /// # Arguments
    ///
    /// * `interval` - Time between probe starts; raised to
    ///   [`MIN_PROBE_INTERVAL`] when shorter
    ///
    /// # Returns
    ///
    /// A handle that exposes the status and owns the polling task
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime
    pub fn start(&self, interval: Duration) -> HealthHandle {
        let (tx, rx) = watch::channel(HealthStatus::Unknown);
        let cancellation = CancellationToken::new();
        let api = Arc::clone(&self.api);
        let token = cancellation.clone();

        if interval < MIN_PROBE_INTERVAL {
            tracing::warn!(
                "Health interval {:?} is too short, using {:?}",
                interval,
                MIN_PROBE_INTERVAL
            );
        }
        let interval = interval.max(MIN_PROBE_INTERVAL);

        tracing::info!("Starting health monitor (interval {:?})", interval);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;

                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let status = tokio::select! {
                    biased;

                    _ = token.cancelled() => break,
                    status = probe(api.as_ref()) => status,
                };

                tx.send_if_modified(|current| {
                    if *current == status {
                        return false;
                    }
                    tracing::info!("Backend is now {}", status);
                    *current = status;
                    true
                });
            }

            tracing::debug!("Health monitor stopped");
        });

        HealthHandle {
            status: rx,
            cancellation,
            task: Some(task),
        }
    }

    /// Stops a running monitor
    ///
    /// Equivalent to [`HealthHandle::stop`].
    pub async fn stop(handle: HealthHandle) {
        handle.stop().await;
    }
}

async fn probe(api: &dyn CompanionApi) -> HealthStatus {
    match api.probe().await {
        Ok(()) => {
            increment_counter!("confidant_health_probes_total", "status" => "online");
            HealthStatus::Online
        }
        Err(e) => {
            tracing::debug!("Liveness probe failed: {}", e);
            increment_counter!("confidant_health_probes_total", "status" => "offline");
            HealthStatus::Offline
        }
    }
}

/// Owner of a running [`HealthMonitor`] task
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct HealthHandle {
    status: watch::Receiver<HealthStatus>,
    cancellation: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HealthHandle {
    /// Latest published status
    pub fn status(&self) -> HealthStatus {
        *self.status.borrow()
    }

    /// Receiver notified whenever the status changes
    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.status.clone()
    }

    /// Cancels polling and waits for the task to exit
    pub async fn stop(mut self) {
        self.cancellation.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Health monitor task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for HealthHandle {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
