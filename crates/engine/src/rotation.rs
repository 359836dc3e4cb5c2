//! Rotation state tracker for round-robin rules.
//!
//! [`RotationTracker::next`] reads the durable cursor and picks the next
//! slot. The advance is not written here: it travels inside the
//! [`AssignmentCommit`](crate::ports::AssignmentCommit) as a
//! compare-and-swap, so a failed commit leaves the cursor where it was.

use std::sync::Arc;

use rowdesk_core::assignment::rotation;
use rowdesk_core::types::DbId;

use crate::error::LookupError;
use crate::ports::{RotationAdvance, RotationStore};

/// A selected rotation slot together with the cursor advance that claims it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPick {
    pub assignee_id: DbId,
    pub advance: RotationAdvance,
}

pub struct RotationTracker {
    store: Arc<dyn RotationStore>,
}

impl RotationTracker {
    pub fn new(store: Arc<dyn RotationStore>) -> Self {
        Self { store }
    }

    /// Pick the slot after the rule's cursor, skipping `exclude`.
    ///
    /// Callers must hold the rule's lock from this call until the commit.
    pub async fn next(
        &self,
        rule_id: DbId,
        pool: &[DbId],
        exclude: Option<DbId>,
    ) -> Result<Option<RotationPick>, LookupError> {
        if pool.is_empty() {
            return Ok(None);
        }
        let expected = self
            .store
            .load_cursor(rule_id)
            .await?
            .map(|cursor| cursor.last_index);

        Ok(
            rotation::select(pool, expected, exclude.as_ref()).map(|index| RotationPick {
                assignee_id: pool[index],
                advance: RotationAdvance {
                    expected,
                    next: index as i32,
                },
            }),
        )
    }
}
