//! Reassignment eligibility for the periodic sweep.

use chrono::Duration;
use serde::Serialize;

use super::rules::ReassignmentPolicy;
use super::work_item::{ItemStatus, WorkItem};
use crate::types::Timestamp;

/// Why an item is due for reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ReassignReason {
    /// No activity on the item for longer than `inactivity_days`.
    Inactive { threshold_days: u32 },
    /// Pending for longer than `pending_days`.
    PendingTooLong { threshold_days: u32 },
}

/// Decide whether `item` should be taken from its current assignee at `now`.
///
/// Only pending items are eligible. A threshold must be strictly exceeded;
/// inactivity is checked before pending duration.
pub fn due_reason(
    policy: &ReassignmentPolicy,
    item: &WorkItem,
    now: Timestamp,
) -> Option<ReassignReason> {
    if !policy.enabled || item.status != ItemStatus::PendingReview {
        return None;
    }

    if let Some(days) = policy.inactivity_days {
        if now - item.last_activity_at > Duration::days(i64::from(days)) {
            return Some(ReassignReason::Inactive {
                threshold_days: days,
            });
        }
    }

    if let (Some(days), Some(since)) = (policy.pending_days, item.pending_since) {
        if now - since > Duration::days(i64::from(days)) {
            return Some(ReassignReason::PendingTooLong {
                threshold_days: days,
            });
        }
    }

    None
}
