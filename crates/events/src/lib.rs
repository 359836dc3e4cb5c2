//! Assignment event bus and audit log.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`AssignmentEvent`]: the envelope the engine publishes whenever it
//!   assigns, reassigns, or fails a lookup.
//! - [`EventPersistence`]: background service that writes every event to
//!   the `assignment_events` table.

pub mod bus;
pub mod persistence;

pub use bus::{AssignmentEvent, AssignmentEventKind, EventBus};
pub use persistence::EventPersistence;
