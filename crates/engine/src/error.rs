use rowdesk_core::types::DbId;

/// An external lookup (workload, staff directory, rule store) failed.
///
/// Recovered locally: the rule being resolved is skipped and evaluation
/// moves on to the next candidate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("{service} unavailable: {message}")]
    Unavailable {
        service: &'static str,
        message: String,
    },

    #[error("{service} lookup timed out after {timeout_ms} ms")]
    Timeout {
        service: &'static str,
        timeout_ms: u64,
    },
}

impl LookupError {
    pub fn unavailable(service: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Unavailable {
            service,
            message: err.to_string(),
        }
    }
}

/// Committing an assignment failed. Nothing from the attempt is applied.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Rotation cursor for rule {rule_id} changed concurrently")]
    CursorConflict { rule_id: DbId },

    #[error("Work item {0} changed since it was read")]
    ItemChanged(DbId),

    #[error("Work item {0} not found")]
    ItemNotFound(DbId),

    #[error("Assignment rule {0} not found")]
    RuleNotFound(DbId),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Failure of a whole engine call.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Failed to load assignment rules for sheet {sheet_id}: {source}")]
    RuleLoad {
        sheet_id: DbId,
        #[source]
        source: LookupError,
    },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Convenience alias for engine results.
pub type EngineResult<T> = Result<T, EngineError>;
