//! Work item models.

use rowdesk_core::assignment::{ItemStatus, WorkItem};
use rowdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{decode_json, decode_text};

/// A row from the `work_items` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkItemRow {
    pub id: DbId,
    pub sheet_id: DbId,
    pub status: String,
    pub priority: String,
    pub tags: Vec<String>,
    pub custom_fields: serde_json::Value,
    pub assignee_id: Option<DbId>,
    pub assignee_history: Vec<DbId>,
    pub assignment_rule_id: Option<DbId>,
    pub creator_id: Option<DbId>,
    pub last_activity_at: Timestamp,
    pub pending_since: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl WorkItemRow {
    pub fn into_item(self) -> Result<WorkItem, sqlx::Error> {
        Ok(WorkItem {
            id: self.id,
            sheet_id: self.sheet_id,
            status: decode_text::<ItemStatus>("status", &self.status)?,
            priority: self.priority,
            tags: self.tags.into_iter().collect(),
            custom_fields: decode_json("custom_fields", self.custom_fields)?,
            assignee_id: self.assignee_id,
            assignee_history: self.assignee_history,
            assignment_rule_id: self.assignment_rule_id,
            creator_id: self.creator_id,
            last_activity_at: self.last_activity_at,
            pending_since: self.pending_since,
        })
    }
}

/// DTO for creating a work item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkItem {
    pub sheet_id: DbId,
    pub status: Option<ItemStatus>,
    pub priority: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub custom_fields: Option<serde_json::Value>,
    pub creator_id: Option<DbId>,
    pub last_activity_at: Option<Timestamp>,
    pub pending_since: Option<Timestamp>,
}
