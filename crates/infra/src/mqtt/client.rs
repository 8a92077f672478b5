use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use polestar_common::resilience::RetryConfig;
use polestar_core::BusPublisher;
use polestar_domain::{Availability, BridgeError, BusConfig, Qos, Result};
use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Outgoing, QoS};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::reconnect::{connect_with_backoff, ConnectOutcome};
use crate::errors::InfraError;
use crate::scheduling::BusLifecycle;

/// Requests queued between the poll loop and the driver task.
///
/// One changed feed puts all of its leaves into this queue at once; a walk
/// that overruns it fails with `Publish` and is repeated in full next cycle.
/// The vehicle feed has a few dozen leaves, telemetry fewer.
const REQUEST_CHANNEL_CAPACITY: usize = 512;
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

fn to_qos(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
    }
}

/// Connection options for `config`, including the last will
pub fn mqtt_options(config: &BusConfig) -> MqttOptions {
    let mut options =
        MqttOptions::new(config.client_id.as_str(), config.host.as_str(), config.port);
    options.set_keep_alive(config.keep_alive);
    options.set_clean_session(true);

    if let Some(username) = config.username.as_deref().filter(|user| !user.is_empty()) {
        let password =
            config.password.as_ref().map(|secret| secret.expose().to_string()).unwrap_or_default();
        options.set_credentials(username, password);
    }

    if let Some(availability) = &config.availability {
        options.set_last_will(LastWill::new(
            availability.topic.as_str(),
            availability.offline.clone().into_bytes(),
            QoS::AtLeastOnce,
            true,
        ));
    }

    options
}

fn retry_config(config: &BusConfig) -> Result<RetryConfig> {
    RetryConfig::builder()
        .max_attempts(config.retry.max_attempts)
        .exponential(config.retry.initial_delay, config.retry.max_delay)
        .build()
        .map_err(|err| BridgeError::Config(err.to_string()))
}

/// Publish the online beacon; the driver calls this after every (re)connect
fn announce_online(client: &AsyncClient, availability: Option<&Availability>) {
    let Some(availability) = availability else {
        return;
    };
    let topic = availability.topic.as_str();
    let payload = availability.online.clone().into_bytes();
    if let Err(err) = client.try_publish(topic, QoS::AtLeastOnce, true, payload) {
        warn!(topic = %availability.topic, error = %err, "Failed to queue online beacon");
    }
}

/// Shared between the bus handle and its driver task
struct DriverState {
    /// Cancelled when any bus sharing the token gives up
    failed: CancellationToken,
    failure: Mutex<Option<BridgeError>>,
}

impl DriverState {
    fn fail(&self, err: BridgeError) {
        if let Ok(mut slot) = self.failure.lock() {
            *slot = Some(err);
        }
        self.failed.cancel();
    }
}

/// Client handle for one broker
///
/// Created by [`MqttBus::connect`], which only returns once the broker has
/// acknowledged the connection. Reconnects after a dropped connection run in
/// the background with the same backoff policy; when that budget runs out the
/// error is stored (see [`MqttBus::failure`]) and the `failed` token passed to
/// `connect` is cancelled.
pub struct MqttBus {
    name: String,
    client: AsyncClient,
    availability: Option<Availability>,
    state: Arc<DriverState>,
    driver: Mutex<Option<JoinHandle<()>>>,
    stop: CancellationToken,
}

impl MqttBus {
    /// Connect with backoff, announce liveness and start the driver task
    ///
    /// `Ok(None)` means `shutdown` fired before the broker became reachable.
    pub async fn connect(
        config: &BusConfig,
        shutdown: &CancellationToken,
        failed: CancellationToken,
    ) -> Result<Option<Self>> {
        let name = format!("{}:{}", config.host, config.port);
        let retry = retry_config(config)?;
        let (client, mut eventloop) =
            AsyncClient::new(mqtt_options(config), REQUEST_CHANNEL_CAPACITY);

        info!(broker = %name, client_id = %config.client_id, "Connecting to broker");
        let outcome = connect_with_backoff(&mut eventloop, &retry, shutdown, &name).await?;
        if outcome == ConnectOutcome::Cancelled {
            return Ok(None);
        }
        announce_online(&client, config.availability.as_ref());

        let state = Arc::new(DriverState { failed, failure: Mutex::new(None) });
        let stop = CancellationToken::new();
        let driver = tokio::spawn(drive(
            eventloop,
            client.clone(),
            config.availability.clone(),
            retry,
            name.clone(),
            state.clone(),
            shutdown.clone(),
            stop.clone(),
        ));

        Ok(Some(Self {
            name,
            client,
            availability: config.availability.clone(),
            state,
            driver: Mutex::new(Some(driver)),
            stop,
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The error that ended the driver, if any
    pub fn failure(&self) -> Option<BridgeError> {
        self.state.failure.lock().ok().and_then(|slot| slot.clone())
    }

    /// Announce `offline`, disconnect cleanly and wait for the driver to finish
    ///
    /// A clean disconnect suppresses the last will, hence the explicit beacon.
    pub async fn shutdown(&self) {
        if let Some(availability) = &self.availability {
            let payload = availability.offline.clone().into_bytes();
            if let Err(err) = self
                .client
                .publish(availability.topic.as_str(), QoS::AtLeastOnce, true, payload)
                .await
            {
                debug!(broker = %self.name, error = %err, "Offline beacon not queued");
            }
        }
        if let Err(err) = self.client.disconnect().await {
            debug!(broker = %self.name, error = %err, "Disconnect not queued");
        }

        let handle = self.driver.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await {
                Ok(Ok(())) => info!(broker = %self.name, "Disconnected from broker"),
                Ok(Err(err)) => warn!(broker = %self.name, error = %err, "Broker driver panicked"),
                Err(_) => {
                    warn!(broker = %self.name, "Broker driver did not stop in time, aborting");
                    self.stop.cancel();
                }
            }
        }
    }
}

impl Drop for MqttBus {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

#[async_trait]
impl BusPublisher for MqttBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: Qos, retain: bool) -> Result<()> {
        if self.failure().is_some() {
            return Err(BridgeError::Publish(format!("broker {} is unavailable", self.name)));
        }
        self.client
            .try_publish(topic, to_qos(qos), retain, payload)
            .map_err(|err| BridgeError::from(InfraError::from(err)))
    }
}

#[async_trait]
impl BusLifecycle for MqttBus {
    fn name(&self) -> &str {
        MqttBus::name(self)
    }

    fn failure(&self) -> Option<BridgeError> {
        MqttBus::failure(self)
    }

    async fn shutdown(&self) {
        MqttBus::shutdown(self).await;
    }
}

/// Background driver owning the event loop
#[allow(clippy::too_many_arguments)]
async fn drive(
    mut eventloop: EventLoop,
    client: AsyncClient,
    availability: Option<Availability>,
    retry: RetryConfig,
    name: String,
    state: Arc<DriverState>,
    shutdown: CancellationToken,
    stop: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = stop.cancelled() => break,
            event = eventloop.poll() => event,
        };

        match event {
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!(broker = %name, "Disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(err) => {
                let err = BridgeError::from(InfraError::from(err));
                warn!(broker = %name, error = %err, "Broker connection lost, reconnecting");

                let attempt = connect_with_backoff(&mut eventloop, &retry, &shutdown, &name);
                let reconnect = tokio::select! {
                    _ = stop.cancelled() => break,
                    result = attempt => result,
                };
                match reconnect {
                    Ok(ConnectOutcome::Connected) => {
                        announce_online(&client, availability.as_ref());
                    }
                    Ok(ConnectOutcome::Cancelled) => break,
                    Err(err) => {
                        error!(broker = %name, error = %err, "Broker unreachable, giving up");
                        state.fail(err);
                        break;
                    }
                }
            }
        }
    }
}
