//! Deterministic rule evaluation order.

use std::cmp::Ordering;

use super::rules::{AssignmentRule, TriggerEvent};

/// Priority descending, then creation time ascending, then id ascending.
pub fn evaluation_order(a: &AssignmentRule, b: &AssignmentRule) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Active rules for `event`, in evaluation order.
///
/// Repositories already filter and sort; this is applied again so the
/// engine's order never depends on a collaborator getting it right.
pub fn candidates(rules: Vec<AssignmentRule>, event: TriggerEvent) -> Vec<AssignmentRule> {
    let mut rules: Vec<AssignmentRule> = rules
        .into_iter()
        .filter(|rule| rule.is_candidate_for(event))
        .collect();
    rules.sort_by(evaluation_order);
    rules
}
