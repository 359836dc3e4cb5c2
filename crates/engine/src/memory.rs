//! In-memory backend implementing every collaborator trait.
//!
//! State lives behind one mutex, so each commit is trivially atomic. Intended
//! for tests and local tooling.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use rowdesk_core::assignment::ordering::evaluation_order;
use rowdesk_core::assignment::rotation::RotationCursor;
use rowdesk_core::assignment::{
    AssignmentRule, ItemStatus, RuleStatus, StaffMember, TriggerEvent, WorkItem,
};
use rowdesk_core::types::DbId;

use crate::error::{LookupError, PersistenceError};
use crate::ports::{
    AssignmentCommit, AssignmentStore, ItemSnapshot, RotationStore, RuleRepository,
    StaffDirectory, StaffFilter, SuperiorKind, WorkItemSource, WorkloadQuery,
};

#[derive(Default)]
struct MemoryState {
    rules: BTreeMap<DbId, AssignmentRule>,
    items: BTreeMap<DbId, WorkItem>,
    staff: BTreeMap<DbId, StaffMember>,
    cursors: HashMap<DbId, RotationCursor>,
    /// Open items held outside this store, added to the computed count.
    base_workload: HashMap<DbId, i64>,
}

#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<MemoryState>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_rule(&self, rule: AssignmentRule) {
        self.state().rules.insert(rule.id, rule);
    }

    pub fn insert_item(&self, item: WorkItem) {
        self.state().items.insert(item.id, item);
    }

    pub fn insert_staff(&self, member: StaffMember) {
        self.state().staff.insert(member.id, member);
    }

    pub fn set_base_workload(&self, staff_id: DbId, open_items: i64) {
        self.state().base_workload.insert(staff_id, open_items);
    }

    /// Overwrite a cursor as another writer would.
    pub fn set_cursor(&self, cursor: RotationCursor) {
        self.state().cursors.insert(cursor.rule_id, cursor);
    }

    pub fn rule(&self, id: DbId) -> Option<AssignmentRule> {
        self.state().rules.get(&id).cloned()
    }

    pub fn item(&self, id: DbId) -> Option<WorkItem> {
        self.state().items.get(&id).cloned()
    }

    pub fn cursor(&self, rule_id: DbId) -> Option<RotationCursor> {
        self.state().cursors.get(&rule_id).cloned()
    }
}

#[async_trait]
impl RuleRepository for InMemoryBackend {
    async fn load_rules(
        &self,
        sheet_id: DbId,
        event: TriggerEvent,
    ) -> Result<Vec<AssignmentRule>, LookupError> {
        let mut rules: Vec<_> = self
            .state()
            .rules
            .values()
            .filter(|r| r.sheet_id == sheet_id && r.is_candidate_for(event))
            .cloned()
            .collect();
        rules.sort_by(evaluation_order);
        Ok(rules)
    }

    async fn load_reassignment_rules(
        &self,
        sheet_id: DbId,
    ) -> Result<Vec<AssignmentRule>, LookupError> {
        let mut rules: Vec<_> = self
            .state()
            .rules
            .values()
            .filter(|r| {
                r.sheet_id == sheet_id && r.status == RuleStatus::Active && r.reassignment.enabled
            })
            .cloned()
            .collect();
        rules.sort_by(evaluation_order);
        Ok(rules)
    }

    async fn sheets_with_reassignment(&self) -> Result<Vec<DbId>, LookupError> {
        let sheets: BTreeSet<DbId> = self
            .state()
            .rules
            .values()
            .filter(|r| r.status == RuleStatus::Active && r.reassignment.enabled)
            .map(|r| r.sheet_id)
            .collect();
        Ok(sheets.into_iter().collect())
    }
}

#[async_trait]
impl WorkloadQuery for InMemoryBackend {
    async fn count_open_items(&self, staff_id: DbId) -> Result<i64, LookupError> {
        let state = self.state();
        let held = state
            .items
            .values()
            .filter(|i| i.assignee_id == Some(staff_id) && i.status.is_open())
            .count() as i64;
        Ok(held + state.base_workload.get(&staff_id).copied().unwrap_or(0))
    }
}

#[async_trait]
impl StaffDirectory for InMemoryBackend {
    async fn find_staff(&self, filter: &StaffFilter) -> Result<Option<StaffMember>, LookupError> {
        Ok(self
            .state()
            .staff
            .values()
            .filter(|m| m.is_active && Some(m.id) != filter.exclude_id)
            .filter(|m| filter.role.as_deref().map_or(true, |role| m.role == role))
            .find(|m| m.has_all_skills(&filter.required_skills))
            .cloned())
    }

    async fn list_staff(&self, ids: &[DbId]) -> Result<Vec<StaffMember>, LookupError> {
        let state = self.state();
        Ok(ids.iter().filter_map(|id| state.staff.get(id)).cloned().collect())
    }

    async fn find_superior(
        &self,
        staff_id: DbId,
        kind: SuperiorKind,
    ) -> Result<Option<StaffMember>, LookupError> {
        let state = self.state();
        let superior_id = state.staff.get(&staff_id).and_then(|m| match kind {
            SuperiorKind::Manager => m.manager_id,
            SuperiorKind::Supervisor => m.supervisor_id,
        });
        Ok(superior_id.and_then(|id| state.staff.get(&id)).cloned())
    }
}

#[async_trait]
impl RotationStore for InMemoryBackend {
    async fn load_cursor(&self, rule_id: DbId) -> Result<Option<RotationCursor>, LookupError> {
        Ok(self.cursor(rule_id))
    }
}

#[async_trait]
impl AssignmentStore for InMemoryBackend {
    async fn commit(&self, commit: &AssignmentCommit) -> Result<(), PersistenceError> {
        let mut state = self.state();

        let Some(stored) = state.items.get(&commit.work_item_id) else {
            return Err(PersistenceError::ItemNotFound(commit.work_item_id));
        };
        if let Some(expected) = commit.expected_item {
            if ItemSnapshot::of(stored) != expected {
                return Err(PersistenceError::ItemChanged(commit.work_item_id));
            }
        }
        if !state.rules.contains_key(&commit.rule_id) {
            return Err(PersistenceError::RuleNotFound(commit.rule_id));
        }
        if let Some(advance) = commit.rotation {
            let current = state.cursors.get(&commit.rule_id).map(|c| c.last_index);
            if current != advance.expected {
                return Err(PersistenceError::CursorConflict {
                    rule_id: commit.rule_id,
                });
            }
            state.cursors.insert(
                commit.rule_id,
                RotationCursor {
                    rule_id: commit.rule_id,
                    last_index: advance.next,
                    updated_at: commit.applied_at,
                },
            );
        }

        if let Some(item) = state.items.get_mut(&commit.work_item_id) {
            item.record_assignee(commit.assignee_id, commit.rule_id, commit.applied_at);
        }
        if let Some(rule) = state.rules.get_mut(&commit.rule_id) {
            rule.statistics.total_assignments += commit.delta.assignments;
            rule.statistics.total_reassignments += commit.delta.reassignments;
            rule.statistics.last_applied = Some(commit.applied_at);
        }
        Ok(())
    }
}

#[async_trait]
impl WorkItemSource for InMemoryBackend {
    async fn pending_items_for_rule(&self, rule_id: DbId) -> Result<Vec<WorkItem>, LookupError> {
        let mut items: Vec<_> = self
            .state()
            .items
            .values()
            .filter(|i| {
                i.assignment_rule_id == Some(rule_id) && i.status == ItemStatus::PendingReview
            })
            .cloned()
            .collect();
        items.sort_by_key(|i| (i.last_activity_at, i.id));
        Ok(items)
    }
}
