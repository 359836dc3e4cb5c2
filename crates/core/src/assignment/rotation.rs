//! Round-robin slot arithmetic over a durable per-rule cursor.
//!
//! The cursor stores the pool index of the last member handed out. The next
//! call hands out the following index, wrapping at the end of the pool. A
//! stored index that no longer fits the pool restarts the rotation at 0.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Durable rotation position for one round-robin rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationCursor {
    pub rule_id: DbId,
    pub last_index: i32,
    pub updated_at: Timestamp,
}

/// The index the rotation hands out next, or `None` for an empty pool.
pub fn next_index(pool_len: usize, last_index: Option<i32>) -> Option<usize> {
    if pool_len == 0 {
        return None;
    }
    let start = match last_index {
        Some(i) if i >= 0 && (i as usize) < pool_len => (i as usize + 1) % pool_len,
        _ => 0,
    };
    Some(start)
}

/// Pick the next pool index, skipping entries equal to `exclude`.
///
/// Returns `None` when the pool is empty or every entry is excluded.
pub fn select<T: PartialEq>(
    pool: &[T],
    last_index: Option<i32>,
    exclude: Option<&T>,
) -> Option<usize> {
    let start = next_index(pool.len(), last_index)?;
    (0..pool.len())
        .map(|offset| (start + offset) % pool.len())
        .find(|&i| exclude != Some(&pool[i]))
}
