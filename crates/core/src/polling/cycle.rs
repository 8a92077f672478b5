//! One pass of the poll loop
//!
//! Order per cycle: renew the session if needed, fetch and gate the vehicle
//! attributes, fetch and gate the telemetry (forwarding the state of charge to
//! the side channel when it changed). Any failure aborts the rest of the
//! cycle. Sleeping between cycles and the heartbeat belong to the scheduler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use polestar_domain::constants::{HEARTBEAT_FORMAT, SOC_POINTER};
use polestar_domain::{Qos, Result, Session, Tree};
use tracing::{debug, info, warn};

use crate::auth::SessionManager;
use crate::publish::ports::BusPublisher;
use crate::publish::{GateOutcome, SnapshotSlot};
use crate::vehicle::ports::VehicleDataSource;

/// Secondary bus receiving only the state of charge
#[derive(Clone)]
pub struct SideChannel {
    pub publisher: Arc<dyn BusPublisher>,
    pub topic: String,
}

/// Liveness timestamp published after every cycle
#[derive(Debug, Clone)]
pub struct Heartbeat {
    pub topic: String,
    pub timezone: Tz,
}

impl Heartbeat {
    /// Timestamp text for `now`, rendered in the configured zone
    pub fn render(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.timezone).format(HEARTBEAT_FORMAT).to_string()
    }
}

/// Summary of a successful cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub vehicle: GateOutcome,
    pub telemetry: GateOutcome,
    /// State of charge sent to the side channel, if any
    pub soc_forwarded: Option<Tree>,
}

/// Owns everything a cycle mutates: the session and the snapshot cache
pub struct PollCycle {
    sessions: SessionManager,
    source: Arc<dyn VehicleDataSource>,
    bus: Arc<dyn BusPublisher>,
    side_channel: Option<SideChannel>,
    heartbeat: Heartbeat,
    vin: String,
    session: Option<Session>,
    authenticated: bool,
    vehicle: SnapshotSlot,
    telemetry: SnapshotSlot,
}

impl PollCycle {
    pub fn new(
        sessions: SessionManager,
        source: Arc<dyn VehicleDataSource>,
        bus: Arc<dyn BusPublisher>,
        vin: impl Into<String>,
        vehicle_prefix: impl Into<String>,
        telemetry_prefix: impl Into<String>,
        heartbeat: Heartbeat,
    ) -> Self {
        Self {
            sessions,
            source,
            bus,
            side_channel: None,
            heartbeat,
            vin: vin.into(),
            session: None,
            authenticated: false,
            vehicle: SnapshotSlot::new(vehicle_prefix),
            telemetry: SnapshotSlot::new(telemetry_prefix),
        }
    }

    /// Forward the state of charge to a secondary bus
    pub fn with_side_channel(mut self, side_channel: SideChannel) -> Self {
        self.side_channel = Some(side_channel);
        self
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Whether the latest run obtained a usable session, even if a later step failed
    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    pub async fn run_once(&mut self) -> Result<CycleReport> {
        self.authenticated = false;
        let session = self.sessions.ensure_valid(self.session.as_ref()).await?;
        let token = session.access_token.clone();
        self.session = Some(session);
        self.authenticated = true;

        let fetched = self.source.fetch_vehicle(&token, &self.vin).await;
        let vehicle = self.guard(fetched)?;
        let vehicle = self.vehicle.publish_if_changed(self.bus.as_ref(), vehicle).await?;

        let fetched = self.source.fetch_telemetry(&token, &self.vin).await;
        let telemetry = self.guard(fetched)?;
        let soc = telemetry.pointer(SOC_POINTER).cloned();
        let telemetry = self.telemetry.publish_if_changed(self.bus.as_ref(), telemetry).await?;

        let soc_forwarded = if telemetry.changed() { self.forward_soc(soc).await } else { None };

        info!(
            vehicle_changed = vehicle.changed(),
            telemetry_changed = telemetry.changed(),
            "Poll cycle complete"
        );
        Ok(CycleReport { vehicle, telemetry, soc_forwarded })
    }

    /// Publish the liveness timestamp
    pub async fn heartbeat(&self) -> Result<()> {
        let stamp = self.heartbeat.render(Utc::now());
        debug!(topic = %self.heartbeat.topic, %stamp, "Publishing heartbeat");
        self.bus.publish(&self.heartbeat.topic, stamp.into_bytes(), Qos::AtLeastOnce, true).await
    }

    /// Drop the session when the API rejected its token
    fn guard(&mut self, fetched: Result<Tree>) -> Result<Tree> {
        if let Err(err) = &fetched {
            if err.is_unauthorized() {
                warn!(error = %err, "Access token rejected, session discarded");
                self.session = None;
            }
        }
        fetched
    }

    async fn forward_soc(&self, soc: Option<Tree>) -> Option<Tree> {
        let side = self.side_channel.as_ref()?;
        let Some(soc) = soc.filter(|value| !value.is_null()) else {
            warn!(
                topic = %side.topic,
                "Telemetry carries no state of charge, side channel skipped"
            );
            return None;
        };

        info!(topic = %side.topic, soc = %soc, "Forwarding state of charge");
        let payload = soc.to_string().into_bytes();
        match side.publisher.publish(&side.topic, payload, Qos::AtLeastOnce, true).await {
            Ok(()) => Some(soc),
            Err(err) => {
                warn!(error = %err, topic = %side.topic, "Side channel publish failed");
                None
            }
        }
    }
}
