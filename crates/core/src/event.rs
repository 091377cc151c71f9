//! Domain event system: decoupled notification of routing and handoff activity.
//!
//! Events are published when a task moves through the engine. Observers
//! (logs, the HTTP surface, tests) subscribe without coupling to the
//! dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A task was classified and composed.
    TaskSubmitted {
        task_id: String,
        active_profiles: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// Resolution left a category undecided.
    PreferenceConflict {
        task_id: String,
        category: String,
        candidates: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// The handoff state machine moved to a new phase.
    PhaseChanged {
        task_id: String,
        from: String,
        to: String,
        version: u64,
        timestamp: DateTime<Utc>,
    },

    /// Collaboration is parked on missing contract items.
    ContractUnsatisfied {
        task_id: String,
        missing: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// The task reached its terminal phase.
    TaskClosed {
        task_id: String,
        timestamp: DateTime<Utc>,
    },

    /// The caller discarded the task's handoff state.
    TaskCancelled {
        task_id: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine.
        if let Err(broadcast::error::SendError(event)) = self.sender.send(Arc::new(event)) {
            debug!(event = ?event, "Event dropped, no subscribers");
        }
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
