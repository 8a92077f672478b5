//! Mock port implementations
//!
//! Each mock pops scripted results from a queue and falls back to a benign
//! default once the script is exhausted. Call counters let tests assert which
//! provider operations ran.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use polestar_core::{Authenticator, BusPublisher, VehicleDataSource};
use polestar_domain::{BridgeError, Credentials, Qos, Result as DomainResult, Session, Tree};
use serde_json::json;

use super::session_expiring_in;

/// Scripted identity provider.
#[derive(Default)]
pub struct MockAuthenticator {
    logins: Mutex<VecDeque<DomainResult<Session>>>,
    refreshes: Mutex<VecDeque<DomainResult<Session>>>,
    login_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
}

impl MockAuthenticator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_login(self, result: DomainResult<Session>) -> Self {
        self.logins.lock().unwrap().push_back(result);
        self
    }

    pub fn with_refresh(self, result: DomainResult<Session>) -> Self {
        self.refreshes.lock().unwrap().push_back(result);
        self
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn begin_login(&self, _credentials: &Credentials) -> DomainResult<Session> {
        let n = self.login_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let scripted = self.logins.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            let refresh = format!("refresh-login-{n}");
            Ok(session_expiring_in(3600, &format!("access-login-{n}"), Some(&refresh)))
        })
    }

    async fn refresh(&self, _session: &Session) -> DomainResult<Session> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.refreshes.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Err(BridgeError::refresh(500, "unscripted refresh")))
    }
}

pub fn vehicle_tree() -> Tree {
    json!({
        "vin": "LPSVSEDEEML002398",
        "internalVehicleIdentifier": "ada1d4f5",
        "modelYear": "2022",
        "content": {"model": {"code": "534", "name": "Polestar 2"}},
        "hasPerformancePackage": false,
        "registrationNo": null
    })
}

pub fn telemetry_tree(soc: i64) -> Tree {
    json!({
        "battery": {
            "batteryChargeLevelPercentage": soc,
            "chargingStatus": "CHARGING_STATUS_IDLE",
            "estimatedDistanceToEmptyKm": 250
        },
        "odometer": {
            "odometerMeters": 12_345_000,
            "eventUpdatedTimestamp": {"iso": "2024-03-01T12:00:00Z", "unix": "1709294400"}
        }
    })
}

/// Scripted vehicle API.
#[derive(Default)]
pub struct MockVehicleSource {
    vehicles: Mutex<VecDeque<DomainResult<Tree>>>,
    telemetry: Mutex<VecDeque<DomainResult<Tree>>>,
    tokens: Mutex<Vec<String>>,
    telemetry_calls: AtomicUsize,
}

impl MockVehicleSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vehicle(self, result: DomainResult<Tree>) -> Self {
        self.vehicles.lock().unwrap().push_back(result);
        self
    }

    pub fn with_telemetry(self, result: DomainResult<Tree>) -> Self {
        self.telemetry.lock().unwrap().push_back(result);
        self
    }

    /// Bearer tokens seen, in call order
    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn telemetry_calls(&self) -> usize {
        self.telemetry_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VehicleDataSource for MockVehicleSource {
    async fn fetch_vehicle(&self, access_token: &str, _vin: &str) -> DomainResult<Tree> {
        self.tokens.lock().unwrap().push(access_token.to_string());
        let scripted = self.vehicles.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(vehicle_tree()))
    }

    async fn fetch_telemetry(&self, _access_token: &str, _vin: &str) -> DomainResult<Tree> {
        self.telemetry_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.telemetry.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(telemetry_tree(57)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub qos: Qos,
    pub retain: bool,
}

/// Bus that records every message.
#[derive(Default)]
pub struct RecordingBus {
    messages: Mutex<Vec<Published>>,
    failing: AtomicBool,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following publish fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<Published> {
        self.messages.lock().unwrap().clone()
    }

    pub fn topics_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|m| m.topic.starts_with(prefix))
            .map(|m| m.topic)
            .collect()
    }

    pub fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

#[async_trait]
impl BusPublisher for RecordingBus {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: Qos,
        retain: bool,
    ) -> DomainResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BridgeError::Publish("broker gone".to_string()));
        }
        self.messages.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8(payload).unwrap(),
            qos,
            retain,
        });
        Ok(())
    }
}
