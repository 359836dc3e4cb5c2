//! Assignment audit log models.

use rowdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `assignment_events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssignmentEventRow {
    pub id: DbId,
    pub event_type: String,
    pub work_item_id: Option<DbId>,
    pub rule_id: Option<DbId>,
    pub assignee_id: Option<DbId>,
    pub previous_assignee_id: Option<DbId>,
    pub payload: serde_json::Value,
    pub occurred_at: Timestamp,
    pub created_at: Timestamp,
}

/// DTO for inserting an audit log entry.
#[derive(Debug, Clone)]
pub struct CreateAssignmentEvent<'a> {
    pub event_type: &'a str,
    pub work_item_id: Option<DbId>,
    pub rule_id: Option<DbId>,
    pub assignee_id: Option<DbId>,
    pub previous_assignee_id: Option<DbId>,
    pub payload: &'a serde_json::Value,
    pub occurred_at: Timestamp,
}
