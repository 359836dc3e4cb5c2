//! Read-only views of the entities the engine consumes but does not own.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Review workflow status of a work item. Transitions are owned elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Draft,
    PendingReview,
    Approved,
    Rejected,
    Returned,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingReview => "pending_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Returned => "returned",
        }
    }

    /// Statuses that count towards a staff member's open workload.
    pub const OPEN: &'static [ItemStatus] =
        &[ItemStatus::Draft, ItemStatus::PendingReview, ItemStatus::Returned];

    pub fn is_open(self) -> bool {
        Self::OPEN.contains(&self)
    }
}

impl FromStr for ItemStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "pending_review" => Ok(Self::PendingReview),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "returned" => Ok(Self::Returned),
            other => Err(CoreError::Validation(format!(
                "Invalid item status '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row on a sheet, as seen by the assignment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: DbId,
    pub sheet_id: DbId,
    pub status: ItemStatus,
    pub priority: String,
    pub tags: BTreeSet<String>,
    pub custom_fields: HashMap<String, serde_json::Value>,
    pub assignee_id: Option<DbId>,
    /// Everyone who has ever been primary assignee, without duplicates.
    pub assignee_history: Vec<DbId>,
    /// The rule that produced the current assignment, if any.
    pub assignment_rule_id: Option<DbId>,
    pub creator_id: Option<DbId>,
    pub last_activity_at: Timestamp,
    /// When the item entered its current pending status.
    pub pending_since: Option<Timestamp>,
}

impl WorkItem {
    /// Apply an assignee the way a commit does: set the primary assignee and
    /// remember it in the history exactly once.
    pub fn record_assignee(&mut self, assignee_id: DbId, rule_id: DbId, at: Timestamp) {
        self.assignee_id = Some(assignee_id);
        if !self.assignee_history.contains(&assignee_id) {
            self.assignee_history.push(assignee_id);
        }
        self.assignment_rule_id = Some(rule_id);
        self.last_activity_at = at;
    }
}

/// A staff directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: DbId,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub skills: BTreeSet<String>,
    pub manager_id: Option<DbId>,
    pub supervisor_id: Option<DbId>,
}

impl StaffMember {
    /// True when the member holds every skill in `required`.
    pub fn has_all_skills(&self, required: &[String]) -> bool {
        required.iter().all(|skill| self.skills.contains(skill))
    }
}
