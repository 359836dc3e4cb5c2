//! Save-time rule validation.
//!
//! Used by the rule repository before persisting. The engine itself treats an
//! unusable configuration as "no candidate" and never calls into here.

use std::collections::HashSet;

use super::rules::{
    AssignmentStrategy, FieldPredicate, ReassignTarget, ReassignmentPolicy, TriggerConditions,
};
use crate::error::CoreError;
use crate::types::DbId;

/// Maximum length of a rule name.
pub const MAX_RULE_NAME_LEN: usize = 200;

/// Maximum number of staff members in one pool.
pub const MAX_POOL_SIZE: usize = 500;

/// Validate every part of a rule definition.
pub fn validate_rule_definition(
    name: &str,
    conditions: &TriggerConditions,
    strategy: &AssignmentStrategy,
    reassignment: &ReassignmentPolicy,
) -> Result<(), CoreError> {
    validate_rule_name(name)?;
    validate_conditions(conditions)?;
    validate_strategy(strategy)?;
    validate_reassignment(reassignment, strategy)
}

pub fn validate_rule_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(
            "Rule name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_RULE_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Rule name must not exceed {MAX_RULE_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Custom field predicates must name a field, and `in_range` bounds must be
/// ordered when both are numbers.
pub fn validate_conditions(conditions: &TriggerConditions) -> Result<(), CoreError> {
    for (i, cond) in conditions.custom_fields.iter().enumerate() {
        if cond.field.trim().is_empty() {
            return Err(CoreError::Configuration(format!(
                "Custom field condition at index {i} has no field name"
            )));
        }
        if let FieldPredicate::InRange { min, max } = &cond.predicate {
            if let (Some(lo), Some(hi)) = (min.as_f64(), max.as_f64()) {
                if lo > hi {
                    return Err(CoreError::Configuration(format!(
                        "Range for field \"{}\" has min {lo} greater than max {hi}",
                        cond.field
                    )));
                }
            }
        }
    }
    Ok(())
}

pub fn validate_strategy(strategy: &AssignmentStrategy) -> Result<(), CoreError> {
    match strategy {
        AssignmentStrategy::RoundRobin { staff_pool }
        | AssignmentStrategy::LeastLoaded { staff_pool }
        | AssignmentStrategy::ManualPool { staff_pool } => {
            if staff_pool.is_empty() {
                return Err(CoreError::Configuration(format!(
                    "Strategy {} requires a non-empty staff pool",
                    strategy.kind()
                )));
            }
            validate_pool(staff_pool)
        }
        AssignmentStrategy::ByRole { target_role } => {
            if target_role.trim().is_empty() {
                return Err(CoreError::Configuration(
                    "Strategy by_role requires a target role".to_string(),
                ));
            }
            Ok(())
        }
        AssignmentStrategy::BySkill {
            required_skills,
            staff_pool,
        } => {
            if required_skills.is_empty() {
                return Err(CoreError::Configuration(
                    "Strategy by_skill requires at least one skill".to_string(),
                ));
            }
            validate_pool(staff_pool)
        }
        AssignmentStrategy::Creator => Ok(()),
    }
}

fn validate_pool(pool: &[DbId]) -> Result<(), CoreError> {
    if pool.len() > MAX_POOL_SIZE {
        return Err(CoreError::Configuration(format!(
            "A staff pool may have at most {MAX_POOL_SIZE} members"
        )));
    }
    let mut seen = HashSet::with_capacity(pool.len());
    for id in pool {
        if !seen.insert(*id) {
            return Err(CoreError::Configuration(format!(
                "Staff member {id} appears more than once in the pool"
            )));
        }
    }
    Ok(())
}

/// An enabled policy needs at least one non-zero threshold, and
/// `next_in_pool` needs a strategy that has other candidates to offer.
pub fn validate_reassignment(
    policy: &ReassignmentPolicy,
    strategy: &AssignmentStrategy,
) -> Result<(), CoreError> {
    if !policy.enabled {
        return Ok(());
    }
    if policy.inactivity_days.is_none() && policy.pending_days.is_none() {
        return Err(CoreError::Configuration(
            "Reassignment is enabled but neither inactivity_days nor pending_days is set"
                .to_string(),
        ));
    }
    if policy.inactivity_days == Some(0) || policy.pending_days == Some(0) {
        return Err(CoreError::Configuration(
            "Reassignment thresholds must be at least one day".to_string(),
        ));
    }
    if policy.reassign_to == ReassignTarget::NextInPool
        && matches!(strategy, AssignmentStrategy::Creator)
    {
        return Err(CoreError::Configuration(
            "Reassignment to next_in_pool is not possible with the creator strategy".to_string(),
        ));
    }
    Ok(())
}
