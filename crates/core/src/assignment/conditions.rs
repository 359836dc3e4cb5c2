//! Condition evaluator. Pure logic, no database access.

use std::cmp::Ordering;

use serde_json::Value;

use super::rules::{CustomFieldCondition, FieldPredicate, TriggerConditions};
use super::work_item::WorkItem;

/// Evaluate a rule's trigger conditions against a work item.
///
/// Groups are ANDed. An empty group is no constraint. Custom field predicates
/// run in declared order and stop at the first failure.
pub fn matches(conditions: &TriggerConditions, item: &WorkItem) -> bool {
    if !conditions.status.is_empty() && !conditions.status.contains(&item.status) {
        return false;
    }
    if !conditions.priority.is_empty() && !conditions.priority.contains(&item.priority) {
        return false;
    }
    if !conditions.tags.is_empty() && !conditions.tags.iter().any(|t| item.tags.contains(t)) {
        return false;
    }
    conditions
        .custom_fields
        .iter()
        .all(|cond| evaluate_custom_field(cond, item))
}

fn evaluate_custom_field(cond: &CustomFieldCondition, item: &WorkItem) -> bool {
    let value = match item.custom_fields.get(&cond.field) {
        Some(v) if !v.is_null() => v,
        _ => return false,
    };

    match &cond.predicate {
        FieldPredicate::Equals { value: expected } => values_equal(value, expected),
        FieldPredicate::Contains { value: needle } => {
            string_form(value).contains(string_form(needle).as_str())
        }
        FieldPredicate::GreaterThan { value: bound } => {
            compare(value, bound) == Some(Ordering::Greater)
        }
        FieldPredicate::LessThan { value: bound } => compare(value, bound) == Some(Ordering::Less),
        FieldPredicate::InRange { min, max } => {
            matches!(
                compare(value, min),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(compare(value, max), Some(Ordering::Less | Ordering::Equal))
        }
    }
}

/// JSON equality, except that numbers compare by value (`3` equals `3.0`).
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Strings compare by their contents; everything else by its JSON text.
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Order two values when they share a comparable type.
///
/// Number/number compares numerically and string/string lexically (which
/// also orders ISO-8601 dates). Any other pairing is incomparable.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
