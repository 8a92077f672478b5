//! MQTT bus adapter
//!
//! One [`MqttBus`] per broker. The event loop is owned by a background driver
//! task, which is the only place that reconnects; publishers just queue
//! messages on the client handle.

mod client;
pub mod reconnect;

pub use client::{mqtt_options, MqttBus};
pub use reconnect::{connect_with_backoff, ConnectAttempt, ConnectOutcome};
