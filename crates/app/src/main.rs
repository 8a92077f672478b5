//! polestar2mqtt
//!
//! Polls the Polestar vehicle API and republishes vehicle data and telemetry
//! as retained MQTT topics.

mod logging;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use polestar_core::{BusPublisher, Heartbeat, PollCycle, SessionManager, SideChannel};
use polestar_domain::constants::{TOPIC_TELEMETRY, TOPIC_VEHICLE};
use polestar_domain::Config;
use polestar_infra::{
    load_from_env, IdentityClient, MqttBus, PollScheduler, SchedulerConfig, VehicleApiClient,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    logging::init();
    match dotenv {
        Ok(path) => info!(path = %path.display(), "Loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "Could not read .env"),
    }

    match run().await {
        Ok(()) => {
            info!("polestar2mqtt stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %format!("{err:#}"), "polestar2mqtt failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let config = load_from_env().context("invalid configuration")?;
    info!(
        vin = %config.vin,
        broker = %format!("{}:{}", config.bus.host, config.bus.port),
        base_topic = %config.base_topic,
        interval_secs = config.poll.interval.as_secs(),
        side_channel = config.side_channel.is_some(),
        "Starting polestar2mqtt"
    );

    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());
    let bus_failed = CancellationToken::new();

    let Some(bus) = MqttBus::connect(&config.bus, &shutdown, bus_failed.clone())
        .await
        .context("MQTT broker unavailable")?
    else {
        return Ok(());
    };
    let bus = Arc::new(bus);

    let side_bus = match &config.side_channel {
        Some(side) => match MqttBus::connect(&side.bus, &shutdown, bus_failed.clone()).await {
            Ok(Some(side_bus)) => Some((Arc::new(side_bus), side.soc_topic())),
            Ok(None) => {
                bus.shutdown().await;
                return Ok(());
            }
            Err(err) => {
                bus.shutdown().await;
                return Err(err).context("openWB broker unavailable");
            }
        },
        None => None,
    };

    let mut scheduler = build_scheduler(&config, bus.clone(), side_bus.clone(), bus_failed)?;
    scheduler = scheduler.with_bus(bus);
    if let Some((side_bus, _)) = side_bus {
        scheduler = scheduler.with_bus(side_bus);
    }

    scheduler.run(shutdown).await.context("poll loop stopped")
}

fn build_scheduler(
    config: &Config,
    bus: Arc<MqttBus>,
    side_bus: Option<(Arc<MqttBus>, String)>,
    bus_failed: CancellationToken,
) -> Result<PollScheduler> {
    let identity = IdentityClient::new(config.identity.clone()).context("identity client")?;
    let api = VehicleApiClient::new(&config.api).context("vehicle API client")?;
    let sessions = SessionManager::new(
        Arc::new(identity),
        config.credentials.clone(),
        config.poll.token_margin,
    );
    let heartbeat = Heartbeat { topic: config.last_update_topic(), timezone: config.timezone };

    let mut cycle = PollCycle::new(
        sessions,
        Arc::new(api),
        bus as Arc<dyn BusPublisher>,
        config.vin.clone(),
        config.topic(TOPIC_VEHICLE),
        config.topic(TOPIC_TELEMETRY),
        heartbeat,
    );
    if let Some((side_bus, topic)) = side_bus {
        cycle = cycle.with_side_channel(SideChannel { publisher: side_bus, topic });
    }

    Ok(PollScheduler::new(cycle, SchedulerConfig::from(&config.poll), bus_failed))
}

/// Cancel `shutdown` on Ctrl-C or SIGTERM
fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Termination signal received");
        shutdown.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
        }
        Err(err) => {
            warn!(error = %err, "SIGTERM handler unavailable, listening for Ctrl-C only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
