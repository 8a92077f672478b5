//! Configuration loader
//!
//! Loads the bridge configuration from environment variables. A `.env` file,
//! if present, is applied to the process environment by the binary before
//! this loader runs.
//!
//! ## Environment Variables
//! - `POLESTAR_EMAIL`, `POLESTAR_PASSWORD`, `POLESTAR_VIN`: account (required)
//! - `POLESTAR_CYCLE`: poll interval in seconds (default 300)
//! - `POLESTAR_ID_URI`, `POLESTAR_API_URL`: provider endpoints
//! - `POLESTAR_HTTP_TIMEOUT`: per-request timeout in seconds (default 30)
//! - `POLESTAR_TOKEN_MARGIN`: renew this many seconds before expiry (default 15, at most 3600)
//! - `POLESTAR_MAX_LOGIN_FAILURES`: consecutive failed logins before exit (default 5)
//! - `MQTT_BROKER`, `MQTT_PORT`, `MQTT_KEEPALIVE`, `MQTT_USER`, `MQTT_PASSWORD`, `MQTT_CLIENT_ID`
//! - `MQTT_RETRY_MAX_ATTEMPTS`, `MQTT_RETRY_INITIAL_DELAY`, `MQTT_RETRY_MAX_DELAY`
//! - `BASE_TOPIC`: topic prefix (default `polestar2`)
//! - `TZ`: IANA zone of the heartbeat timestamp (default `Europe/Berlin`)
//! - `OPENWB_PUBLISH`, `OPENWB_HOST`, `OPENWB_PORT`, `OPENWB_LP_NUM`: charge point side channel

use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use polestar_domain::constants::*;
use polestar_domain::{
    ApiConfig, Availability, BridgeError, BusConfig, Config, Credentials, IdentityConfig,
    PollConfig, Result, RetrySettings, Secret, SideChannelConfig,
};

/// Load configuration from the process environment
///
/// # Errors
/// Returns `BridgeError::Config` if required variables are missing or any
/// value fails validation.
pub fn load_from_env() -> Result<Config> {
    load_from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary key lookup
///
/// Empty values are treated as unset.
pub fn load_from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let env = Env { lookup };

    let email = env.required("POLESTAR_EMAIL")?;
    let password = env.required("POLESTAR_PASSWORD")?;
    let vin = validate_vin(&env.required("POLESTAR_VIN")?)?;

    let interval = env.seconds("POLESTAR_CYCLE", DEFAULT_POLL_INTERVAL_SECS)?;
    if interval.is_zero() {
        return Err(BridgeError::Config("POLESTAR_CYCLE must be greater than 0".into()));
    }
    let http_timeout = env.seconds("POLESTAR_HTTP_TIMEOUT", DEFAULT_HTTP_TIMEOUT_SECS)?;
    if http_timeout.is_zero() {
        return Err(BridgeError::Config("POLESTAR_HTTP_TIMEOUT must be greater than 0".into()));
    }

    let token_margin = env.seconds("POLESTAR_TOKEN_MARGIN", DEFAULT_TOKEN_MARGIN_SECS)?;
    if token_margin.as_secs() > MAX_TOKEN_MARGIN_SECS {
        return Err(BridgeError::Config(format!(
            "POLESTAR_TOKEN_MARGIN must not exceed {MAX_TOKEN_MARGIN_SECS} seconds"
        )));
    }

    let base_topic = env.string("BASE_TOPIC", DEFAULT_BASE_TOPIC).trim_end_matches('/').to_string();
    if base_topic.is_empty() {
        return Err(BridgeError::Config("BASE_TOPIC must not be empty".into()));
    }

    let timezone_name = env.string("TZ", DEFAULT_TIMEZONE);
    let timezone = Tz::from_str(&timezone_name)
        .map_err(|_| BridgeError::Config(format!("Unknown time zone in TZ: {timezone_name}")))?;

    let retry = RetrySettings {
        max_attempts: env.number("MQTT_RETRY_MAX_ATTEMPTS", DEFAULT_RETRY_MAX_ATTEMPTS)?,
        initial_delay: env.seconds("MQTT_RETRY_INITIAL_DELAY", DEFAULT_RETRY_INITIAL_DELAY_SECS)?,
        max_delay: env.seconds("MQTT_RETRY_MAX_DELAY", DEFAULT_RETRY_MAX_DELAY_SECS)?,
    };
    if retry.max_attempts == 0 {
        return Err(BridgeError::Config("MQTT_RETRY_MAX_ATTEMPTS must be greater than 0".into()));
    }
    if retry.initial_delay > retry.max_delay {
        return Err(BridgeError::Config(
            "MQTT_RETRY_INITIAL_DELAY must not exceed MQTT_RETRY_MAX_DELAY".into(),
        ));
    }

    let keep_alive = env.seconds("MQTT_KEEPALIVE", DEFAULT_MQTT_KEEPALIVE_SECS)?;
    if keep_alive.is_zero() {
        return Err(BridgeError::Config("MQTT_KEEPALIVE must be greater than 0".into()));
    }
    let client_id = env.string("MQTT_CLIENT_ID", DEFAULT_MQTT_CLIENT_ID);

    let bus = BusConfig {
        host: env.string("MQTT_BROKER", DEFAULT_MQTT_HOST),
        port: env.number("MQTT_PORT", DEFAULT_MQTT_PORT)?,
        keep_alive,
        client_id: client_id.clone(),
        username: env.optional("MQTT_USER"),
        password: env.optional("MQTT_PASSWORD").map(Secret::new),
        retry,
        availability: Some(Availability::new(format!("{base_topic}/{TOPIC_STATUS}"))),
    };

    let side_channel = if env.flag("OPENWB_PUBLISH", false)? {
        let charge_point: u8 = env.number("OPENWB_LP_NUM", DEFAULT_CHARGE_POINT)?;
        if !(1..=MAX_CHARGE_POINT).contains(&charge_point) {
            return Err(BridgeError::Config(format!(
                "OPENWB_LP_NUM must be between 1 and {MAX_CHARGE_POINT}, got {charge_point}"
            )));
        }
        Some(SideChannelConfig {
            bus: BusConfig {
                host: env.string("OPENWB_HOST", DEFAULT_MQTT_HOST),
                port: env.number("OPENWB_PORT", DEFAULT_MQTT_PORT)?,
                keep_alive,
                client_id: format!("{client_id}-openwb"),
                username: None,
                password: None,
                retry,
                availability: None,
            },
            charge_point,
        })
    } else {
        None
    };

    Ok(Config {
        credentials: Credentials { email, password: Secret::new(password) },
        vin,
        identity: IdentityConfig {
            base_url: env
                .string("POLESTAR_ID_URI", DEFAULT_IDENTITY_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            client_id: OAUTH_CLIENT_ID.to_string(),
            redirect_uri: OAUTH_REDIRECT_URI.to_string(),
            scope: OAUTH_SCOPE.to_string(),
            timeout: http_timeout,
        },
        api: ApiConfig {
            url: env.string("POLESTAR_API_URL", DEFAULT_API_URL),
            timeout: http_timeout,
        },
        poll: PollConfig {
            interval,
            token_margin,
            max_login_failures: env
                .number("POLESTAR_MAX_LOGIN_FAILURES", DEFAULT_MAX_LOGIN_FAILURES)?,
        },
        bus,
        base_topic,
        timezone,
        side_channel,
    })
}

/// Normalize and check a vehicle identification number
///
/// Accepts 17 characters from `A-Z0-9` without `I`, `O` and `Q`; lower case
/// input is upper-cased first.
pub fn validate_vin(raw: &str) -> Result<String> {
    let vin = raw.trim().to_ascii_uppercase();
    let valid_chars = vin
        .chars()
        .all(|c| c.is_ascii_digit() || (c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q')));
    if vin.len() != 17 || !valid_chars {
        return Err(BridgeError::Config(format!("POLESTAR_VIN is not a valid VIN: {raw:?}")));
    }
    Ok(vin)
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
    }

    /// Get required variable
    ///
    /// # Errors
    /// Returns `BridgeError::Config` if the variable is not set.
    fn required(&self, key: &str) -> Result<String> {
        self.optional(key).ok_or_else(|| {
            BridgeError::Config(format!("Missing required environment variable: {}", key))
        })
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn number<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(value) => value.parse::<T>().map_err(|e| {
                BridgeError::Config(format!("Invalid value for {key}: {value:?} ({e})"))
            }),
            None => Ok(default),
        }
    }

    fn seconds(&self, key: &str, default: u64) -> Result<Duration> {
        self.number(key, default).map(Duration::from_secs)
    }

    /// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
    fn flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.optional(key).map(|value| value.to_ascii_lowercase()) {
            None => Ok(default),
            Some(value) => match value.as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(BridgeError::Config(format!("Invalid boolean for {key}: {value:?}"))),
            },
        }
    }
}
