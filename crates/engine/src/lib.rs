//! Assignment rule engine.
//!
//! [`RuleEngine`] picks an assignee for a work item from a sheet's rules and
//! commits it atomically. [`ReassignmentSweeper`] periodically hands stale
//! pending items to someone else. External systems are reached only through
//! the traits in [`ports`]; [`postgres::PgBackend`] and
//! [`memory::InMemoryBackend`] implement all of them.

pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod memory;
pub mod ports;
pub mod postgres;
pub mod resolver;
pub mod rotation;
pub mod sweeper;

pub use config::EngineConfig;
pub use engine::{AssignmentOutcome, AssignmentPreview, AttemptError, LookupFailure, RuleEngine};
pub use error::{EngineError, EngineResult, LookupError, PersistenceError};
pub use ports::Collaborators;
pub use sweeper::{ReassignmentOutcome, ReassignmentStatus, ReassignmentSweeper};
