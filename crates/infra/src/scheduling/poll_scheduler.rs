//! Main poll loop
//!
//! One sequential loop: run a cycle, publish the heartbeat, wait for the next
//! tick. The wait is raced against the shutdown token and the shared bus
//! failure token, so shutdown latency does not depend on the interval.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use polestar_core::PollCycle;
use polestar_domain::{BridgeError, PollConfig, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle side of a bus client, as seen by the scheduler
#[async_trait]
pub trait BusLifecycle: Send + Sync {
    fn name(&self) -> &str;

    /// The error that made the client give up, if it did
    fn failure(&self) -> Option<BridgeError>;

    /// Disconnect cleanly
    async fn shutdown(&self);
}

/// Configuration for the poll scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// Consecutive failed logins before giving up; 0 never gives up
    pub max_login_failures: u32,
}

impl From<&PollConfig> for SchedulerConfig {
    fn from(poll: &PollConfig) -> Self {
        Self { interval: poll.interval, max_login_failures: poll.max_login_failures }
    }
}

/// Poll scheduler
pub struct PollScheduler {
    cycle: PollCycle,
    config: SchedulerConfig,
    buses: Vec<Arc<dyn BusLifecycle>>,
    bus_failed: CancellationToken,
}

impl PollScheduler {
    /// Create a new scheduler
    ///
    /// # Arguments
    ///
    /// * `cycle` - The poll cycle to drive
    /// * `config` - Scheduler configuration
    /// * `bus_failed` - Token the bus clients cancel when they give up
    pub fn new(cycle: PollCycle, config: SchedulerConfig, bus_failed: CancellationToken) -> Self {
        Self { cycle, config, buses: Vec::new(), bus_failed }
    }

    /// Register a bus to disconnect on exit
    pub fn with_bus(mut self, bus: Arc<dyn BusLifecycle>) -> Self {
        self.buses.push(bus);
        self
    }

    /// Run until `shutdown` is cancelled or a fatal error occurs
    ///
    /// Returns `Ok(())` on a requested shutdown. Fatal errors (broker gone,
    /// too many failed logins) are returned after the buses have been shut
    /// down, so the caller only has to map them to an exit code.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(interval_secs = self.config.interval.as_secs(), "Starting poll loop");
        let result = self.poll_loop(&shutdown).await;
        self.shutdown_buses().await;
        result
    }

    async fn poll_loop(&mut self, shutdown: &CancellationToken) -> Result<()> {
        let mut login_failures: u32 = 0;

        loop {
            match self.cycle.run_once().await {
                Ok(report) => {
                    login_failures = 0;
                    debug!(?report, "Cycle finished");
                }
                Err(err) if err.is_fatal() => {
                    error!(error = %err, error_kind = err.label(), "Fatal error, stopping");
                    return Err(err);
                }
                Err(err) if err.is_login_failure() => {
                    login_failures += 1;
                    error!(
                        error = %err,
                        error_kind = err.label(),
                        consecutive_failures = login_failures,
                        "Login failed, retrying after one interval"
                    );
                    let limit = self.config.max_login_failures;
                    if limit > 0 && login_failures >= limit {
                        error!(
                            consecutive_failures = login_failures,
                            "Too many failed logins, giving up"
                        );
                        return Err(err);
                    }
                }
                Err(err) => {
                    if self.cycle.authenticated() {
                        login_failures = 0;
                    }
                    error!(error = %err, error_kind = err.label(), "Poll cycle failed");
                }
            }

            if let Err(err) = self.cycle.heartbeat().await {
                warn!(error = %err, "Heartbeat not published");
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    return Ok(());
                }
                _ = self.bus_failed.cancelled() => {
                    return Err(self.bus_failure());
                }
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }
    }

    fn bus_failure(&self) -> BridgeError {
        self.buses.iter().find_map(|bus| bus.failure()).unwrap_or_else(|| {
            BridgeError::BrokerUnavailable { attempts: 0, reason: "bus client stopped".into() }
        })
    }

    async fn shutdown_buses(&self) {
        for bus in &self.buses {
            debug!(bus = bus.name(), "Shutting down bus");
            bus.shutdown().await;
        }
    }
}
