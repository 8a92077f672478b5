//! Conversions from external infrastructure errors into domain errors.

use polestar_domain::BridgeError;
use reqwest::Error as HttpError;
use rumqttc::{ClientError, ConnectionError};
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub BridgeError);

impl From<InfraError> for BridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BridgeError> for InfraError {
    fn from(value: BridgeError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoBridgeError {
    fn into_bridge(self) -> BridgeError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BridgeError */
/* -------------------------------------------------------------------------- */

impl IntoBridgeError for HttpError {
    fn into_bridge(self) -> BridgeError {
        if self.is_timeout() {
            return BridgeError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return BridgeError::Network("HTTP connection failure".into());
        }

        if self.is_builder() {
            return BridgeError::Internal(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            return BridgeError::upstream(status.as_u16(), &self.to_string());
        }

        BridgeError::Network(format!("HTTP transport failure: {self}"))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_bridge())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → BridgeError */
/* -------------------------------------------------------------------------- */

impl IntoBridgeError for JsonError {
    fn into_bridge(self) -> BridgeError {
        BridgeError::Protocol(format!("malformed JSON body: {self}"))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_bridge())
    }
}

/* -------------------------------------------------------------------------- */
/* rumqttc errors → BridgeError */
/* -------------------------------------------------------------------------- */

impl IntoBridgeError for ClientError {
    fn into_bridge(self) -> BridgeError {
        match self {
            ClientError::Request(_) | ClientError::TryRequest(_) => {
                BridgeError::Publish("MQTT event loop is not accepting requests".into())
            }
        }
    }
}

impl From<ClientError> for InfraError {
    fn from(value: ClientError) -> Self {
        InfraError(value.into_bridge())
    }
}

impl IntoBridgeError for ConnectionError {
    fn into_bridge(self) -> BridgeError {
        match self {
            ConnectionError::ConnectionRefused(code) => {
                BridgeError::Network(format!("broker refused connection: {code:?}"))
            }
            other => BridgeError::Network(format!("broker connection error: {other}")),
        }
    }
}

impl From<ConnectionError> for InfraError {
    fn from(value: ConnectionError) -> Self {
        InfraError(value.into_bridge())
    }
}
