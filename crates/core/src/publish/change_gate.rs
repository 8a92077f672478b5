//! Snapshot cache with change detection

use polestar_domain::{Qos, Result, Tree};
use tracing::debug;

use super::flatten::flatten;
use super::ports::BusPublisher;

/// What a gate pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Equal to the cached snapshot, nothing sent
    Unchanged,
    /// Full tree republished
    Published { messages: usize },
}

impl GateOutcome {
    pub fn changed(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Last seen snapshot of one data feed
///
/// A changed snapshot republishes every leaf of the new tree, QoS 1 and
/// retained. The cache only moves forward after the whole walk succeeded, so
/// a failed publish is retried in full on the next cycle.
#[derive(Debug, Clone)]
pub struct SnapshotSlot {
    topic_prefix: String,
    last: Option<Tree>,
}

impl SnapshotSlot {
    pub fn new(topic_prefix: impl Into<String>) -> Self {
        Self { topic_prefix: topic_prefix.into(), last: None }
    }

    pub async fn publish_if_changed(
        &mut self,
        publisher: &dyn BusPublisher,
        snapshot: Tree,
    ) -> Result<GateOutcome> {
        if self.last.as_ref() == Some(&snapshot) {
            debug!(prefix = %self.topic_prefix, "Snapshot unchanged");
            return Ok(GateOutcome::Unchanged);
        }

        debug!(
            prefix = %self.topic_prefix,
            snapshot = %serde_json::to_string_pretty(&snapshot).unwrap_or_default(),
            "Snapshot changed"
        );

        let messages = flatten(&self.topic_prefix, &snapshot);
        for (topic, payload) in &messages {
            publisher.publish(topic, payload.clone().into_bytes(), Qos::AtLeastOnce, true).await?;
        }

        self.last = Some(snapshot);
        Ok(GateOutcome::Published { messages: messages.len() })
    }
}
