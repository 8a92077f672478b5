//! Message bus port

use async_trait::async_trait;
use polestar_domain::{Qos, Result};

/// Publishing side of a message bus client
#[async_trait]
pub trait BusPublisher: Send + Sync {
    /// Hand a message to the client for delivery
    ///
    /// Returns once the message is queued; delivery itself is best effort.
    async fn publish(&self, topic: &str, payload: Vec<u8>, qos: Qos, retain: bool) -> Result<()>;
}
