//! Application constants
//!
//! Identity provider parameters, API endpoints, topic names and the defaults
//! of the environment configuration.

// Identity provider (PingFederate instance behind the Polestar ID login)
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://polestarid.eu.polestar.com/as";
pub const OAUTH_CLIENT_ID: &str = "l3oopkc_10";
pub const OAUTH_REDIRECT_URI: &str = "https://www.polestar.com/sign-in-callback";
pub const OAUTH_SCOPE: &str = "openid profile email customer:attributes";
pub const AUTHORIZATION_PATH: &str = "authorization.oauth2";
pub const TOKEN_PATH: &str = "token.oauth2";
pub const RESUME_SUFFIX: &str = "resume/as/authorization.ping";

// Form field names of the credential and consent forms
pub const FORM_USERNAME: &str = "pf.username";
pub const FORM_PASSWORD: &str = "pf.pass";
pub const FORM_SUBMIT: &str = "pf.submit";
pub const FORM_SUBJECT: &str = "subject";

// Vehicle data API
pub const DEFAULT_API_URL: &str = "https://pc-api.polestar.com/eu-north-1/mystar-v2";

// Topic layout below the base topic
pub const TOPIC_VEHICLE: &str = "getConsumerCarsV2";
pub const TOPIC_TELEMETRY: &str = "carTelematics";
pub const TOPIC_STATUS: &str = "container/connected";
pub const TOPIC_LAST_UPDATE: &str = "container/last_update";
pub const STATUS_ONLINE: &str = "online";
pub const STATUS_OFFLINE: &str = "offline";

/// Heartbeat timestamp layout, e.g. `2024-03-01 12:00:00 CET+0100`
pub const HEARTBEAT_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z%z";

/// Path of the state of charge inside the telemetry tree
pub const SOC_POINTER: &str = "/battery/batteryChargeLevelPercentage";

/// Maximum number of body bytes embedded in errors and logs
pub const BODY_PREVIEW_LIMIT: usize = 512;

// Configuration defaults
pub const DEFAULT_TIMEZONE: &str = "Europe/Berlin";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOKEN_MARGIN_SECS: u64 = 15;
/// Upper bound accepted for the renewal margin
pub const MAX_TOKEN_MARGIN_SECS: u64 = 3600;
pub const DEFAULT_MAX_LOGIN_FAILURES: u32 = 5;
pub const DEFAULT_MQTT_HOST: &str = "localhost";
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_MQTT_KEEPALIVE_SECS: u64 = 60;
pub const DEFAULT_MQTT_CLIENT_ID: &str = "polestar2mqtt";
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 20;
pub const DEFAULT_RETRY_INITIAL_DELAY_SECS: u64 = 1;
pub const DEFAULT_RETRY_MAX_DELAY_SECS: u64 = 300;
pub const DEFAULT_BASE_TOPIC: &str = "polestar2";
pub const DEFAULT_CHARGE_POINT: u8 = 1;
pub const MAX_CHARGE_POINT: u8 = 8;
