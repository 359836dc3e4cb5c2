//! Rule evaluation and commit behaviour of `RuleEngine::apply_rules`.

mod common;

use std::collections::HashSet;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use assert_matches::assert_matches;
use common::*;
use rowdesk_core::assignment::{
    AssignmentStrategy, CustomFieldCondition, FieldPredicate, ItemStatus, RuleStatus,
    TriggerConditions, TriggerEvent,
};
use rowdesk_engine::memory::InMemoryBackend;
use rowdesk_engine::ports::Collaborators;
use rowdesk_engine::{EngineConfig, EngineError, LookupError, PersistenceError, RuleEngine};
use rowdesk_events::{AssignmentEventKind, EventBus};
use serde_json::json;

// ---------------------------------------------------------------------------
// Evaluation order and filtering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn round_robin_hands_out_pool_in_order_and_wraps() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 10, round_robin(&[10, 20, 30])));
    let engine = engine(&backend);

    let mut assignees = Vec::new();
    for id in 1..=4 {
        backend.insert_item(item(id));
        let outcome = engine
            .apply_rules(SHEET, &item(id), TriggerEvent::OnCreate)
            .await
            .unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.rule_id, Some(1));
        assignees.push(outcome.assignee_id.unwrap());
    }

    assert_eq!(assignees, vec![10, 20, 30, 10]);
    assert_eq!(backend.cursor(1).unwrap().last_index, 0);

    let stats = backend.rule(1).unwrap().statistics;
    assert_eq!(stats.total_assignments, 4);
    assert_eq!(stats.total_reassignments, 0);
    assert!(stats.last_applied.is_some());
}

#[tokio::test]
async fn commit_writes_assignee_and_history() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 0, round_robin(&[10])));
    backend.insert_item(item(5));

    engine(&backend)
        .apply_rules(SHEET, &item(5), TriggerEvent::OnCreate)
        .await
        .unwrap();
    engine(&backend)
        .apply_rules(SHEET, &item(5), TriggerEvent::OnCreate)
        .await
        .unwrap();

    let stored = backend.item(5).unwrap();
    assert_eq!(stored.assignee_id, Some(10));
    assert_eq!(stored.assignee_history, vec![10]);
    assert_eq!(stored.assignment_rule_id, Some(1));
}

#[tokio::test]
async fn inactive_and_other_event_rules_are_never_used() {
    let backend = Arc::new(InMemoryBackend::new());

    let mut inactive = rule(1, 100, AssignmentStrategy::ManualPool { staff_pool: vec![1] });
    inactive.status = RuleStatus::Inactive;
    let mut archived = rule(2, 90, AssignmentStrategy::ManualPool { staff_pool: vec![2] });
    archived.status = RuleStatus::Archived;
    let mut other_event = rule(3, 80, AssignmentStrategy::ManualPool { staff_pool: vec![3] });
    other_event.event = TriggerEvent::OnStatusChange;
    backend.insert_rule(inactive);
    backend.insert_rule(archived);
    backend.insert_rule(other_event);
    backend.insert_rule(rule(4, 1, AssignmentStrategy::ManualPool { staff_pool: vec![4] }));
    backend.insert_item(item(1));

    let outcome = engine(&backend)
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await
        .unwrap();

    assert_eq!(outcome.rule_id, Some(4));
    assert_eq!(outcome.assignee_id, Some(4));
    for id in 1..=3 {
        assert_eq!(backend.rule(id).unwrap().statistics.total_assignments, 0);
    }
}

#[tokio::test]
async fn highest_priority_resolvable_rule_wins() {
    let backend = Arc::new(InMemoryBackend::new());
    // Matches but has nobody to offer.
    backend.insert_rule(rule(1, 30, AssignmentStrategy::ByRole {
        target_role: "auditor".to_string(),
    }));
    backend.insert_rule(rule(2, 20, AssignmentStrategy::ManualPool { staff_pool: vec![7] }));
    backend.insert_rule(rule(3, 10, AssignmentStrategy::ManualPool { staff_pool: vec![8] }));
    backend.insert_item(item(1));

    let outcome = engine(&backend)
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await
        .unwrap();

    assert_eq!(outcome.rule_id, Some(2));
    assert_eq!(outcome.assignee_id, Some(7));
    assert_eq!(outcome.notifications, Some(json!({ "channel": "email" })));
    assert_eq!(backend.rule(3).unwrap().statistics.total_assignments, 0);
}

#[tokio::test]
async fn equal_priority_prefers_older_rule() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut newer = rule(1, 5, AssignmentStrategy::ManualPool { staff_pool: vec![1] });
    newer.created_at = epoch() + chrono::Duration::hours(1);
    backend.insert_rule(newer);
    backend.insert_rule(rule(2, 5, AssignmentStrategy::ManualPool { staff_pool: vec![2] }));
    backend.insert_item(item(1));

    let outcome = engine(&backend)
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await
        .unwrap();
    assert_eq!(outcome.rule_id, Some(2));
}

#[tokio::test]
async fn status_condition_falls_through_to_catch_all() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut drafts = rule(1, 5, AssignmentStrategy::ManualPool { staff_pool: vec![50] });
    drafts.conditions = TriggerConditions {
        status: vec![ItemStatus::Draft],
        ..Default::default()
    };
    backend.insert_rule(drafts);
    backend.insert_rule(rule(2, 1, AssignmentStrategy::ManualPool { staff_pool: vec![99] }));

    let draft = item(1);
    let mut approved = item(2);
    approved.status = ItemStatus::Approved;
    backend.insert_item(draft.clone());
    backend.insert_item(approved.clone());

    let engine = engine(&backend);
    let first = engine
        .apply_rules(SHEET, &draft, TriggerEvent::OnCreate)
        .await
        .unwrap();
    let second = engine
        .apply_rules(SHEET, &approved, TriggerEvent::OnCreate)
        .await
        .unwrap();

    assert_eq!((first.rule_id, first.assignee_id), (Some(1), Some(50)));
    assert_eq!((second.rule_id, second.assignee_id), (Some(2), Some(99)));
}

#[tokio::test]
async fn in_range_bounds_are_inclusive_end_to_end() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut ranged = rule(1, 1, AssignmentStrategy::ManualPool { staff_pool: vec![3] });
    ranged.conditions = TriggerConditions {
        custom_fields: vec![CustomFieldCondition {
            field: "amount".to_string(),
            predicate: FieldPredicate::InRange {
                min: json!(100),
                max: json!(500),
            },
        }],
        ..Default::default()
    };
    backend.insert_rule(ranged);

    let engine = engine(&backend);
    let cases = [
        (1, json!(100), true),
        (2, json!(500), true),
        (3, json!(501), false),
    ];
    for (id, amount, expected) in cases {
        let mut candidate = item(id);
        candidate.custom_fields.insert("amount".to_string(), amount);
        backend.insert_item(candidate.clone());
        let outcome = engine
            .apply_rules(SHEET, &candidate, TriggerEvent::OnCreate)
            .await
            .unwrap();
        assert_eq!(outcome.applied, expected, "item {id}");
    }
}

#[tokio::test]
async fn no_matching_rule_leaves_item_unassigned() {
    let backend = Arc::new(InMemoryBackend::new());
    let mut tagged = rule(1, 1, round_robin(&[1, 2]));
    tagged.conditions = TriggerConditions {
        tags: vec!["legal".to_string()],
        ..Default::default()
    };
    backend.insert_rule(tagged);
    backend.insert_item(item(1));

    let outcome = engine(&backend)
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await
        .unwrap();

    assert!(!outcome.applied);
    assert_eq!(outcome.assignee_id, None);
    assert!(outcome.lookup_failures.is_empty());
    assert_eq!(backend.item(1).unwrap().assignee_id, None);
    assert!(backend.cursor(1).is_none());
}

#[tokio::test]
async fn manual_trigger_only_runs_manual_rules() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 10, AssignmentStrategy::ManualPool { staff_pool: vec![1] }));
    let mut manual = rule(2, 1, AssignmentStrategy::ManualPool { staff_pool: vec![2] });
    manual.event = TriggerEvent::Manual;
    backend.insert_rule(manual);
    backend.insert_item(item(1));

    let outcome = engine(&backend)
        .apply_rules(SHEET, &item(1), TriggerEvent::Manual)
        .await
        .unwrap();
    assert_eq!(outcome.rule_id, Some(2));
}

// ---------------------------------------------------------------------------
// Creator strategy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn creator_strategy_assigns_item_creator() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 1, AssignmentStrategy::Creator));
    backend.insert_item(item(1));

    let outcome = engine(&backend)
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await
        .unwrap();
    assert_eq!(outcome.assignee_id, Some(900));
}

#[tokio::test]
async fn creator_strategy_without_creator_falls_through() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 10, AssignmentStrategy::Creator));
    backend.insert_rule(rule(2, 1, AssignmentStrategy::ManualPool { staff_pool: vec![4] }));
    let mut orphan = item(1);
    orphan.creator_id = None;
    backend.insert_item(orphan.clone());

    let outcome = engine(&backend)
        .apply_rules(SHEET, &orphan, TriggerEvent::OnCreate)
        .await
        .unwrap();
    assert_eq!(outcome.rule_id, Some(2));
}

// ---------------------------------------------------------------------------
// Least loaded
// ---------------------------------------------------------------------------

#[tokio::test]
async fn least_loaded_follows_changing_workload() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 1, least_loaded(&[1, 2, 3])));
    backend.set_base_workload(1, 3);
    backend.set_base_workload(2, 1);
    backend.set_base_workload(3, 1);
    let engine = engine(&backend);

    let mut picks = Vec::new();
    for id in 1..=3 {
        backend.insert_item(item(id));
        let outcome = engine
            .apply_rules(SHEET, &item(id), TriggerEvent::OnCreate)
            .await
            .unwrap();
        picks.push(outcome.assignee_id.unwrap());
    }

    // [3,1,1] -> 2, then [3,2,1] -> 3, then [3,2,2] -> 2.
    assert_eq!(picks, vec![2, 3, 2]);
}

// ---------------------------------------------------------------------------
// Lookup failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn lookup_failure_skips_rule_and_is_reported() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 10, least_loaded(&[11, 12])));
    backend.insert_rule(rule(2, 1, AssignmentStrategy::ManualPool { staff_pool: vec![5] }));
    backend.insert_item(item(1));

    let mut collaborators = Collaborators::shared(backend.clone());
    collaborators.workload = Arc::new(FailingWorkload {
        inner: backend.clone(),
        failing: HashSet::from([12]),
    });
    let bus = Arc::new(EventBus::default());
    let mut events = bus.subscribe();
    let engine = RuleEngine::new(collaborators, fast_config()).with_events(bus);

    let outcome = engine
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await
        .unwrap();

    assert_eq!(outcome.rule_id, Some(2));
    assert_eq!(outcome.lookup_failures.len(), 1);
    assert_eq!(outcome.lookup_failures[0].rule_id, 1);
    assert_matches!(
        outcome.lookup_failures[0].error,
        LookupError::Unavailable { service: "workload query", .. }
    );

    let first = events.recv().await.unwrap();
    assert_eq!(first.kind, AssignmentEventKind::LookupFailed);
    assert_eq!(first.rule_id, Some(1));
    let second = events.recv().await.unwrap();
    assert_eq!(second.kind, AssignmentEventKind::Applied);
    assert_eq!(second.assignee_id, Some(5));
}

#[tokio::test]
async fn slow_directory_times_out_as_lookup_failure() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_staff(staff(3, "reviewer", &[]));
    backend.insert_rule(rule(1, 10, AssignmentStrategy::ByRole {
        target_role: "reviewer".to_string(),
    }));
    backend.insert_rule(rule(2, 1, AssignmentStrategy::ManualPool { staff_pool: vec![8] }));
    backend.insert_item(item(1));

    let mut collaborators = Collaborators::shared(backend.clone());
    collaborators.directory = Arc::new(SlowDirectory {
        inner: backend.clone(),
        delay: std::time::Duration::from_millis(500),
    });
    let engine = RuleEngine::new(collaborators, fast_config());

    let outcome = engine
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await
        .unwrap();

    assert_eq!(outcome.assignee_id, Some(8));
    assert_matches!(
        outcome.lookup_failures[0].error,
        LookupError::Timeout { timeout_ms: 50, .. }
    );
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_commit_is_fatal_and_does_not_advance_cursor() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 10, round_robin(&[10, 20])));
    backend.insert_rule(rule(2, 1, AssignmentStrategy::ManualPool { staff_pool: vec![5] }));
    backend.insert_item(item(1));

    let mut collaborators = Collaborators::shared(backend.clone());
    collaborators.store = Arc::new(FailingStore {
        inner: backend.clone(),
        failing_items: None,
    });
    let engine = RuleEngine::new(collaborators, fast_config());

    let result = engine
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await;

    assert_matches!(
        result,
        Err(EngineError::Persistence(PersistenceError::Storage(_)))
    );
    assert!(backend.cursor(1).is_none());
    assert_eq!(backend.item(1).unwrap().assignee_id, None);
    assert_eq!(backend.rule(1).unwrap().statistics.total_assignments, 0);
    assert_eq!(backend.rule(2).unwrap().statistics.total_assignments, 0);
}

#[tokio::test]
async fn missing_work_item_surfaces_as_persistence_error() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 1, round_robin(&[10])));

    let result = engine(&backend)
        .apply_rules(SHEET, &item(404), TriggerEvent::OnCreate)
        .await;

    assert_matches!(
        result,
        Err(EngineError::Persistence(PersistenceError::ItemNotFound(404)))
    );
    assert!(backend.cursor(1).is_none());
}

#[tokio::test]
async fn stale_cursor_is_retried_with_next_slot() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 1, round_robin(&[10, 20, 30])));
    backend.insert_item(item(1));

    let mut collaborators = Collaborators::shared(backend.clone());
    collaborators.store = Arc::new(CursorThief {
        inner: backend.clone(),
        steals: AtomicU32::new(1),
    });
    let engine = RuleEngine::new(collaborators, fast_config());

    let outcome = engine
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await
        .unwrap();

    assert_eq!(outcome.assignee_id, Some(20));
    assert_eq!(backend.cursor(1).unwrap().last_index, 1);
    assert_eq!(backend.rule(1).unwrap().statistics.total_assignments, 1);
}

#[tokio::test]
async fn cursor_conflict_beyond_retry_limit_is_fatal() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 1, round_robin(&[10, 20, 30])));
    backend.insert_item(item(1));

    let mut collaborators = Collaborators::shared(backend.clone());
    collaborators.store = Arc::new(CursorThief {
        inner: backend.clone(),
        steals: AtomicU32::new(5),
    });
    let config = EngineConfig {
        commit_retry_limit: 2,
        ..fast_config()
    };
    let engine = RuleEngine::new(collaborators, config);

    let result = engine
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await;

    assert_matches!(
        result,
        Err(EngineError::Persistence(PersistenceError::CursorConflict { rule_id: 1 }))
    );
    assert_eq!(backend.item(1).unwrap().assignee_id, None);
    assert_eq!(backend.rule(1).unwrap().statistics.total_assignments, 0);
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_take_distinct_rotation_slots() {
    const CALLS: i64 = 8;
    let pool: Vec<i64> = (100..100 + CALLS).collect();

    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 1, round_robin(&pool)));
    for id in 1..=CALLS {
        backend.insert_item(item(id));
    }
    let engine = Arc::new(engine(&backend));

    let handles: Vec<_> = (1..=CALLS)
        .map(|id| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .apply_rules(SHEET, &item(id), TriggerEvent::OnCreate)
                    .await
                    .unwrap()
                    .assignee_id
                    .unwrap()
            })
        })
        .collect();

    let mut assignees = Vec::new();
    for handle in handles {
        assignees.push(handle.await.unwrap());
    }
    assignees.sort_unstable();

    assert_eq!(assignees, pool);
    assert_eq!(backend.rule(1).unwrap().statistics.total_assignments, CALLS);
}

// ---------------------------------------------------------------------------
// Preview
// ---------------------------------------------------------------------------

#[tokio::test]
async fn preview_commits_nothing() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.insert_rule(rule(1, 1, round_robin(&[10, 20])));
    backend.insert_item(item(1));
    let engine = engine(&backend);

    for _ in 0..2 {
        let preview = engine
            .preview_rules(SHEET, &item(1), TriggerEvent::OnCreate)
            .await
            .unwrap();
        assert_eq!(preview.rule_id, Some(1));
        assert_eq!(preview.assignee_id, Some(10));
    }
    assert!(backend.cursor(1).is_none());
    assert_eq!(backend.item(1).unwrap().assignee_id, None);
    assert_eq!(backend.rule(1).unwrap().statistics.total_assignments, 0);

    let applied = engine
        .apply_rules(SHEET, &item(1), TriggerEvent::OnCreate)
        .await
        .unwrap();
    assert_eq!(applied.assignee_id, Some(10));
}
