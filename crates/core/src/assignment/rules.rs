//! Assignment rule configuration.
//!
//! A rule maps a trigger (lifecycle event plus conditions) to an
//! [`AssignmentStrategy`]. Rules are authored by administrators and read by
//! the engine; the engine only ever mutates [`RuleStatistics`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Status and trigger event
// ---------------------------------------------------------------------------

/// Rule lifecycle status. Only [`RuleStatus::Active`] rules are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    Active,
    Inactive,
    Archived,
}

impl RuleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for RuleStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "archived" => Ok(Self::Archived),
            other => Err(CoreError::Validation(format!(
                "Invalid rule status '{other}'. Must be one of: active, inactive, archived"
            ))),
        }
    }
}

impl fmt::Display for RuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The work item lifecycle moment that invokes rule evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    OnCreate,
    OnStatusChange,
    OnPriorityChange,
    Manual,
}

impl TriggerEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnCreate => "on_create",
            Self::OnStatusChange => "on_status_change",
            Self::OnPriorityChange => "on_priority_change",
            Self::Manual => "manual",
        }
    }
}

impl FromStr for TriggerEvent {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on_create" => Ok(Self::OnCreate),
            "on_status_change" => Ok(Self::OnStatusChange),
            "on_priority_change" => Ok(Self::OnPriorityChange),
            "manual" => Ok(Self::Manual),
            other => Err(CoreError::Validation(format!(
                "Invalid trigger event '{other}'. Must be one of: on_create, \
                 on_status_change, on_priority_change, manual"
            ))),
        }
    }
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Conjunction of condition groups. An empty group places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerConditions {
    #[serde(default)]
    pub status: Vec<super::ItemStatus>,
    #[serde(default)]
    pub priority: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub custom_fields: Vec<CustomFieldCondition>,
}

/// A predicate over one entry of a work item's custom field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldCondition {
    pub field: String,
    #[serde(flatten)]
    pub predicate: FieldPredicate,
}

/// Comparison applied to a custom field value.
///
/// Comparisons never error: a missing field or incomparable operand types
/// make the predicate fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operator", rename_all = "snake_case")]
pub enum FieldPredicate {
    Equals { value: serde_json::Value },
    /// Substring match on the string form of both operands.
    Contains { value: serde_json::Value },
    GreaterThan { value: serde_json::Value },
    LessThan { value: serde_json::Value },
    /// Inclusive on both bounds.
    InRange {
        min: serde_json::Value,
        max: serde_json::Value,
    },
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How a matching rule picks its assignee.
///
/// Serialized with a `type` tag; fields belonging to other variants are
/// ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// Rotate through an ordered staff pool.
    RoundRobin { staff_pool: Vec<DbId> },
    /// Pick the pool member with the fewest open items; ties go to pool order.
    LeastLoaded { staff_pool: Vec<DbId> },
    /// First active staff member holding the role, in id order.
    ByRole { target_role: String },
    /// First staff member holding every required skill. Searches `staff_pool`
    /// in pool order when it is non-empty, otherwise the whole directory.
    BySkill {
        required_skills: Vec<String>,
        #[serde(default)]
        staff_pool: Vec<DbId>,
    },
    /// First entry of an explicit staff list.
    ManualPool { staff_pool: Vec<DbId> },
    /// The item's creator. The resolver itself never produces a candidate.
    Creator,
}

impl AssignmentStrategy {
    /// Stable tag used in logs and events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RoundRobin { .. } => "round_robin",
            Self::LeastLoaded { .. } => "least_loaded",
            Self::ByRole { .. } => "by_role",
            Self::BySkill { .. } => "by_skill",
            Self::ManualPool { .. } => "manual_pool",
            Self::Creator => "creator",
        }
    }
}

// ---------------------------------------------------------------------------
// Reassignment
// ---------------------------------------------------------------------------

/// Where a stale item is handed when the sweeper reassigns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReassignTarget {
    NextInPool,
    Manager,
    Supervisor,
}

/// Thresholds after which a pending item is taken away from its assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentPolicy {
    pub enabled: bool,
    #[serde(default)]
    pub inactivity_days: Option<u32>,
    #[serde(default)]
    pub pending_days: Option<u32>,
    pub reassign_to: ReassignTarget,
}

impl Default for ReassignmentPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            inactivity_days: None,
            pending_days: None,
            reassign_to: ReassignTarget::NextInPool,
        }
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// Counters maintained by the engine. Never decremented, never reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleStatistics {
    pub total_assignments: i64,
    pub total_reassignments: i64,
    pub last_applied: Option<Timestamp>,
}

/// A stored assignment rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRule {
    pub id: DbId,
    pub sheet_id: DbId,
    pub name: String,
    pub status: RuleStatus,
    /// Higher evaluates first.
    pub priority: i32,
    pub event: TriggerEvent,
    pub conditions: TriggerConditions,
    pub strategy: AssignmentStrategy,
    pub reassignment: ReassignmentPolicy,
    /// Opaque to the engine; forwarded with assignment events.
    pub notifications: serde_json::Value,
    pub statistics: RuleStatistics,
    pub created_at: Timestamp,
}

impl AssignmentRule {
    /// Whether the rule participates in evaluation for `event`.
    pub fn is_candidate_for(&self, event: TriggerEvent) -> bool {
        self.status == RuleStatus::Active && self.event == event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strategy_decodes_from_type_tag() {
        let strategy: AssignmentStrategy =
            serde_json::from_value(json!({"type": "round_robin", "staff_pool": [3, 1, 2]}))
                .unwrap();
        assert_eq!(
            strategy,
            AssignmentStrategy::RoundRobin {
                staff_pool: vec![3, 1, 2]
            }
        );
    }

    #[test]
    fn strategy_ignores_fields_of_other_variants() {
        let strategy: AssignmentStrategy = serde_json::from_value(json!({
            "type": "by_role",
            "target_role": "reviewer",
            "staff_pool": [1, 2],
            "required_skills": ["legal"]
        }))
        .unwrap();
        assert_eq!(
            strategy,
            AssignmentStrategy::ByRole {
                target_role: "reviewer".to_string()
            }
        );
    }

    #[test]
    fn creator_strategy_needs_no_fields() {
        let strategy: AssignmentStrategy =
            serde_json::from_value(json!({"type": "creator"})).unwrap();
        assert_eq!(strategy, AssignmentStrategy::Creator);
        assert_eq!(strategy.kind(), "creator");
    }

    #[test]
    fn custom_field_condition_flattens_operator() {
        let cond: CustomFieldCondition = serde_json::from_value(json!({
            "field": "amount",
            "operator": "in_range",
            "min": 10,
            "max": 20
        }))
        .unwrap();
        assert_eq!(cond.field, "amount");
        assert_eq!(
            cond.predicate,
            FieldPredicate::InRange {
                min: json!(10),
                max: json!(20)
            }
        );
    }

    #[test]
    fn conditions_default_to_empty_groups() {
        let cond: TriggerConditions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(cond, TriggerConditions::default());
    }

    #[test]
    fn trigger_event_round_trips_through_str() {
        for event in [
            TriggerEvent::OnCreate,
            TriggerEvent::OnStatusChange,
            TriggerEvent::OnPriorityChange,
            TriggerEvent::Manual,
        ] {
            assert_eq!(event.as_str().parse::<TriggerEvent>().unwrap(), event);
        }
        assert!("on_delete".parse::<TriggerEvent>().is_err());
    }

    #[test]
    fn rule_status_rejects_unknown() {
        assert_eq!("archived".parse::<RuleStatus>().unwrap(), RuleStatus::Archived);
        assert!("paused".parse::<RuleStatus>().is_err());
    }
}
