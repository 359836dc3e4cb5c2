//! Assignment rule engine building blocks.
//!
//! - [`rules`]: rule configuration (trigger, conditions, strategy, reassignment).
//! - [`work_item`]: the read-only views of work items and staff the engine consumes.
//! - [`conditions`]: the condition evaluator.
//! - [`rotation`]: round-robin slot arithmetic over a durable cursor.
//! - [`ordering`]: deterministic rule evaluation order.
//! - [`reassignment`]: sweep eligibility thresholds.
//! - [`validation`]: save-time rule checks.

pub mod conditions;
pub mod ordering;
pub mod reassignment;
pub mod rotation;
pub mod rules;
pub mod validation;
pub mod work_item;

pub use conditions::matches;
pub use rules::{
    AssignmentRule, AssignmentStrategy, CustomFieldCondition, FieldPredicate, ReassignTarget,
    ReassignmentPolicy, RuleStatistics, RuleStatus, TriggerConditions, TriggerEvent,
};
pub use work_item::{ItemStatus, StaffMember, WorkItem};
