//! Configuration structures
//!
//! Populated by `polestar-infra::config::loader` and validated there; the
//! structs themselves carry no parsing logic.

use std::time::Duration;

use chrono_tz::Tz;

use crate::constants::{STATUS_OFFLINE, STATUS_ONLINE, TOPIC_LAST_UPDATE};
use crate::types::{Credentials, Secret};

/// Complete bridge configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// Upper-cased, validated VIN
    pub vin: String,
    pub identity: IdentityConfig,
    pub api: ApiConfig,
    pub poll: PollConfig,
    pub bus: BusConfig,
    /// Topic prefix, without trailing slash
    pub base_topic: String,
    /// Zone of the heartbeat timestamp
    pub timezone: Tz,
    /// Optional charge-percentage side channel
    pub side_channel: Option<SideChannelConfig>,
}

impl Config {
    /// `{prefix}/{suffix}`
    pub fn topic(&self, suffix: &str) -> String {
        format!("{}/{}", self.base_topic, suffix)
    }

    pub fn last_update_topic(&self) -> String {
        self.topic(TOPIC_LAST_UPDATE)
    }
}

/// Identity provider endpoints and client parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub url: String,
    pub timeout: Duration,
}

/// Poll loop tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Renew the session this long before it expires
    pub token_margin: Duration,
    /// Consecutive failed login cycles before the scheduler gives up
    pub max_login_failures: u32,
}

/// Connection settings for one MQTT broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
    pub client_id: String,
    /// `None` connects anonymously
    pub username: Option<String>,
    pub password: Option<Secret>,
    pub retry: RetrySettings,
    /// Liveness beacon; `None` disables LWT and online/offline messages
    pub availability: Option<Availability>,
}

/// Reconnect policy knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

/// Status topic and the payloads published to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub topic: String,
    pub online: String,
    pub offline: String,
}

impl Availability {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            online: STATUS_ONLINE.to_string(),
            offline: STATUS_OFFLINE.to_string(),
        }
    }
}

/// openWB charge point that receives the state of charge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideChannelConfig {
    pub bus: BusConfig,
    /// Charge point index, 1 to 8
    pub charge_point: u8,
}

impl SideChannelConfig {
    pub fn soc_topic(&self) -> String {
        format!("openWB/set/lp/{}/%Soc", self.charge_point)
    }
}
