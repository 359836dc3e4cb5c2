//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! The engine only signals that something happened; turning an
//! [`AssignmentEvent`] into a notification is a subscriber's job.

use chrono::{DateTime, Utc};
use rowdesk_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// AssignmentEvent
// ---------------------------------------------------------------------------

/// What the engine did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentEventKind {
    #[serde(rename = "assignment.applied")]
    Applied,
    #[serde(rename = "assignment.reassigned")]
    Reassigned,
    #[serde(rename = "assignment.lookup_failed")]
    LookupFailed,
}

impl AssignmentEventKind {
    /// Dot-separated event name stored in the audit log.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "assignment.applied",
            Self::Reassigned => "assignment.reassigned",
            Self::LookupFailed => "assignment.lookup_failed",
        }
    }
}

/// An assignment-related event.
///
/// Built with [`AssignmentEvent::new`] and the `with_*` methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentEvent {
    pub kind: AssignmentEventKind,
    pub work_item_id: DbId,
    pub rule_id: Option<DbId>,
    pub assignee_id: Option<DbId>,
    pub previous_assignee_id: Option<DbId>,
    /// The rule's `notifications` configuration plus event-specific detail.
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl AssignmentEvent {
    pub fn new(kind: AssignmentEventKind, work_item_id: DbId) -> Self {
        Self {
            kind,
            work_item_id,
            rule_id: None,
            assignee_id: None,
            previous_assignee_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_rule(mut self, rule_id: DbId) -> Self {
        self.rule_id = Some(rule_id);
        self
    }

    pub fn with_assignee(mut self, assignee_id: DbId) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }

    pub fn with_previous_assignee(mut self, previous: Option<DbId>) -> Self {
        self.previous_assignee_id = previous;
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use rowdesk_events::bus::{AssignmentEvent, AssignmentEventKind, EventBus};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(AssignmentEvent::new(AssignmentEventKind::Applied, 42).with_assignee(7));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<AssignmentEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no subscribers the event is dropped.
    pub fn publish(&self, event: AssignmentEvent) {
        // SendError only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AssignmentEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
