//! Assignment rule models.

use rowdesk_core::assignment::{
    AssignmentRule, AssignmentStrategy, ReassignmentPolicy, RuleStatistics, RuleStatus,
    TriggerConditions, TriggerEvent,
};
use rowdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{decode_json, decode_text};

/// A row from the `assignment_rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AssignmentRuleRow {
    pub id: DbId,
    pub sheet_id: DbId,
    pub name: String,
    pub status: String,
    pub priority: i32,
    pub trigger_event: String,
    pub conditions: serde_json::Value,
    pub strategy: serde_json::Value,
    pub reassignment: serde_json::Value,
    pub notifications: serde_json::Value,
    pub total_assignments: i64,
    pub total_reassignments: i64,
    pub last_applied_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AssignmentRuleRow {
    /// Convert the stored row into the engine's typed rule.
    pub fn into_rule(self) -> Result<AssignmentRule, sqlx::Error> {
        Ok(AssignmentRule {
            id: self.id,
            sheet_id: self.sheet_id,
            name: self.name,
            status: decode_text::<RuleStatus>("status", &self.status)?,
            priority: self.priority,
            event: decode_text::<TriggerEvent>("trigger_event", &self.trigger_event)?,
            conditions: decode_json::<TriggerConditions>("conditions", self.conditions)?,
            strategy: decode_json::<AssignmentStrategy>("strategy", self.strategy)?,
            reassignment: decode_json::<ReassignmentPolicy>("reassignment", self.reassignment)?,
            notifications: self.notifications,
            statistics: RuleStatistics {
                total_assignments: self.total_assignments,
                total_reassignments: self.total_reassignments,
                last_applied: self.last_applied_at,
            },
            created_at: self.created_at,
        })
    }
}

/// DTO for creating an assignment rule.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAssignmentRule {
    pub sheet_id: DbId,
    pub name: String,
    pub status: Option<RuleStatus>,
    pub priority: Option<i32>,
    pub event: TriggerEvent,
    #[serde(default)]
    pub conditions: TriggerConditions,
    pub strategy: AssignmentStrategy,
    #[serde(default)]
    pub reassignment: ReassignmentPolicy,
    pub notifications: Option<serde_json::Value>,
}

/// DTO for updating an assignment rule. Only `Some` fields are applied.
///
/// Statistics are not editable; they belong to the engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAssignmentRule {
    pub name: Option<String>,
    pub priority: Option<i32>,
    pub event: Option<TriggerEvent>,
    pub conditions: Option<TriggerConditions>,
    pub strategy: Option<AssignmentStrategy>,
    pub reassignment: Option<ReassignmentPolicy>,
    pub notifications: Option<serde_json::Value>,
}
