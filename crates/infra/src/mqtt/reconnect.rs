//! Backoff driver for broker connects

use async_trait::async_trait;
use polestar_common::resilience::RetryConfig;
use polestar_domain::{BridgeError, Result};
use rumqttc::{Event, EventLoop, Packet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::errors::InfraError;

/// One connection attempt against a broker
#[async_trait]
pub trait ConnectAttempt: Send {
    /// Resolve once the broker acknowledged the connection
    async fn attempt(&mut self) -> Result<()>;
}

#[async_trait]
impl ConnectAttempt for EventLoop {
    async fn attempt(&mut self) -> Result<()> {
        loop {
            match self.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                Ok(_) => continue,
                Err(err) => return Err(InfraError::from(err).into()),
            }
        }
    }
}

/// How a backoff run ended without failing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    Connected,
    /// Shutdown was requested while waiting between attempts
    Cancelled,
}

/// Retry `target.attempt()` with doubling delays until it succeeds
///
/// Fails with `BrokerUnavailable` once the attempt budget of `retry` is spent.
/// The wait between attempts is raced against `cancel`.
pub async fn connect_with_backoff<C>(
    target: &mut C,
    retry: &RetryConfig,
    cancel: &CancellationToken,
    broker: &str,
) -> Result<ConnectOutcome>
where
    C: ConnectAttempt + ?Sized,
{
    let mut backoff = retry.start();
    loop {
        let err = match target.attempt().await {
            Ok(()) => {
                info!(broker, attempts = backoff.attempt() + 1, "Connected to broker");
                return Ok(ConnectOutcome::Connected);
            }
            Err(err) => err,
        };

        let Some(delay) = backoff.next_delay() else {
            error!(broker, attempts = backoff.attempt(), error = %err, "Giving up on broker");
            return Err(BridgeError::BrokerUnavailable {
                attempts: backoff.attempt(),
                reason: err.to_string(),
            });
        };

        warn!(
            broker,
            attempt = backoff.attempt(),
            max_attempts = backoff.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Broker connect failed, retrying"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Ok(ConnectOutcome::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
