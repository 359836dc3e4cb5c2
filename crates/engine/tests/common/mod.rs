//! Shared fixtures for engine integration tests.
#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rowdesk_core::assignment::rotation::RotationCursor;
use rowdesk_core::assignment::{
    AssignmentRule, AssignmentStrategy, ItemStatus, ReassignmentPolicy, RuleStatistics,
    RuleStatus, StaffMember, TriggerConditions, TriggerEvent, WorkItem,
};
use rowdesk_core::types::{DbId, Timestamp};
use rowdesk_engine::memory::InMemoryBackend;
use rowdesk_engine::ports::{
    AssignmentCommit, AssignmentStore, Collaborators, RuleRepository, StaffDirectory,
    StaffFilter, SuperiorKind, WorkItemSource, WorkloadQuery,
};
use rowdesk_engine::{EngineConfig, LookupError, PersistenceError, RuleEngine};

pub const SHEET: DbId = 1;

pub fn epoch() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
}

pub fn rule(id: DbId, priority: i32, strategy: AssignmentStrategy) -> AssignmentRule {
    AssignmentRule {
        id,
        sheet_id: SHEET,
        name: format!("rule {id}"),
        status: RuleStatus::Active,
        priority,
        event: TriggerEvent::OnCreate,
        conditions: TriggerConditions::default(),
        strategy,
        reassignment: ReassignmentPolicy::default(),
        notifications: serde_json::json!({ "channel": "email" }),
        statistics: RuleStatistics::default(),
        created_at: epoch(),
    }
}

pub fn round_robin(pool: &[DbId]) -> AssignmentStrategy {
    AssignmentStrategy::RoundRobin {
        staff_pool: pool.to_vec(),
    }
}

pub fn least_loaded(pool: &[DbId]) -> AssignmentStrategy {
    AssignmentStrategy::LeastLoaded {
        staff_pool: pool.to_vec(),
    }
}

pub fn item(id: DbId) -> WorkItem {
    WorkItem {
        id,
        sheet_id: SHEET,
        status: ItemStatus::Draft,
        priority: "normal".to_string(),
        tags: BTreeSet::new(),
        custom_fields: HashMap::new(),
        assignee_id: None,
        assignee_history: Vec::new(),
        assignment_rule_id: None,
        creator_id: Some(900),
        last_activity_at: epoch(),
        pending_since: None,
    }
}

pub fn staff(id: DbId, role: &str, skills: &[&str]) -> StaffMember {
    StaffMember {
        id,
        name: format!("staff {id}"),
        role: role.to_string(),
        is_active: true,
        skills: skills.iter().map(|s| s.to_string()).collect(),
        manager_id: None,
        supervisor_id: None,
    }
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        lookup_timeout: Duration::from_millis(50),
        ..EngineConfig::default()
    }
}

pub fn engine(backend: &Arc<InMemoryBackend>) -> RuleEngine {
    RuleEngine::new(Collaborators::shared(backend.clone()), fast_config())
}

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

/// Workload query that is unavailable for some staff members.
pub struct FailingWorkload {
    pub inner: Arc<InMemoryBackend>,
    pub failing: HashSet<DbId>,
}

#[async_trait]
impl WorkloadQuery for FailingWorkload {
    async fn count_open_items(&self, staff_id: DbId) -> Result<i64, LookupError> {
        if self.failing.contains(&staff_id) {
            return Err(LookupError::unavailable("workload query", "connection refused"));
        }
        self.inner.count_open_items(staff_id).await
    }
}

/// Directory that answers slower than any test timeout.
pub struct SlowDirectory {
    pub inner: Arc<InMemoryBackend>,
    pub delay: Duration,
}

#[async_trait]
impl StaffDirectory for SlowDirectory {
    async fn find_staff(&self, filter: &StaffFilter) -> Result<Option<StaffMember>, LookupError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_staff(filter).await
    }

    async fn list_staff(&self, ids: &[DbId]) -> Result<Vec<StaffMember>, LookupError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_staff(ids).await
    }

    async fn find_superior(
        &self,
        staff_id: DbId,
        kind: SuperiorKind,
    ) -> Result<Option<StaffMember>, LookupError> {
        tokio::time::sleep(self.delay).await;
        self.inner.find_superior(staff_id, kind).await
    }
}

/// Store whose commits always fail, optionally only for some work items.
pub struct FailingStore {
    pub inner: Arc<InMemoryBackend>,
    pub failing_items: Option<HashSet<DbId>>,
}

#[async_trait]
impl AssignmentStore for FailingStore {
    async fn commit(&self, commit: &AssignmentCommit) -> Result<(), PersistenceError> {
        let fails = self
            .failing_items
            .as_ref()
            .map_or(true, |ids| ids.contains(&commit.work_item_id));
        if fails {
            return Err(PersistenceError::Storage("disk full".to_string()));
        }
        self.inner.commit(commit).await
    }
}

/// Store that lets another writer take the selected rotation slot first,
/// `steals` times.
pub struct CursorThief {
    pub inner: Arc<InMemoryBackend>,
    pub steals: AtomicU32,
}

#[async_trait]
impl AssignmentStore for CursorThief {
    async fn commit(&self, commit: &AssignmentCommit) -> Result<(), PersistenceError> {
        if let Some(advance) = commit.rotation {
            let remaining = self.steals.load(Ordering::SeqCst);
            if remaining > 0 {
                self.steals.store(remaining - 1, Ordering::SeqCst);
                self.inner.set_cursor(RotationCursor {
                    rule_id: commit.rule_id,
                    last_index: advance.next,
                    updated_at: commit.applied_at,
                });
            }
        }
        self.inner.commit(commit).await
    }
}

/// Item source that takes its snapshot, then stalls before returning it.
/// With `rules` set, only those rules stall.
pub struct LaggingItems {
    pub inner: Arc<InMemoryBackend>,
    pub delay: Duration,
    pub rules: Option<HashSet<DbId>>,
}

#[async_trait]
impl WorkItemSource for LaggingItems {
    async fn pending_items_for_rule(&self, rule_id: DbId) -> Result<Vec<WorkItem>, LookupError> {
        let items = self.inner.pending_items_for_rule(rule_id).await?;
        let lags = self.rules.as_ref().map_or(true, |ids| ids.contains(&rule_id));
        if lags {
            tokio::time::sleep(self.delay).await;
        }
        Ok(items)
    }
}

/// Rule store that answers slower than any test timeout.
pub struct SlowRules {
    pub inner: Arc<InMemoryBackend>,
    pub delay: Duration,
}

#[async_trait]
impl RuleRepository for SlowRules {
    async fn load_rules(
        &self,
        sheet_id: DbId,
        event: TriggerEvent,
    ) -> Result<Vec<AssignmentRule>, LookupError> {
        tokio::time::sleep(self.delay).await;
        self.inner.load_rules(sheet_id, event).await
    }

    async fn load_reassignment_rules(
        &self,
        sheet_id: DbId,
    ) -> Result<Vec<AssignmentRule>, LookupError> {
        tokio::time::sleep(self.delay).await;
        self.inner.load_reassignment_rules(sheet_id).await
    }

    async fn sheets_with_reassignment(&self) -> Result<Vec<DbId>, LookupError> {
        tokio::time::sleep(self.delay).await;
        self.inner.sheets_with_reassignment().await
    }
}
