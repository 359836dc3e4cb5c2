//! Per-rule critical sections.
//!
//! Resolution and commit for one rule run under that rule's lock so that
//! concurrent callers take sequential rotation slots and never lose a
//! statistics update. Different rules never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rowdesk_core::types::DbId;
use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
pub struct RuleLocks {
    locks: Mutex<HashMap<DbId, Arc<tokio::sync::Mutex<()>>>>,
}

impl RuleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `rule_id`. The section ends when the
    /// guard is dropped.
    pub async fn lock(&self, rule_id: DbId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(rule_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}
