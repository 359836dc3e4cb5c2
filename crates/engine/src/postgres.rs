//! PostgreSQL backend built on the `rowdesk-db` repositories.

use async_trait::async_trait;
use rowdesk_core::assignment::rotation::RotationCursor;
use rowdesk_core::assignment::{AssignmentRule, StaffMember, TriggerEvent, WorkItem};
use rowdesk_core::types::DbId;
use rowdesk_db::repositories::{
    AssignmentCommitRepo, AssignmentRuleRepo, CommitAssignment, CommitResult, CursorAdvance,
    ItemGuard, RotationCursorRepo, StaffRepo, WorkItemRepo,
};
use rowdesk_db::DbPool;

use crate::error::{LookupError, PersistenceError};
use crate::ports::{
    AssignmentCommit, AssignmentStore, RotationStore, RuleRepository, StaffDirectory,
    StaffFilter, SuperiorKind, WorkItemSource, WorkloadQuery,
};

const RULE_STORE: &str = "rule store";
const STAFF_DIRECTORY: &str = "staff directory";
const WORK_ITEMS: &str = "work item store";

/// Every collaborator role backed by one connection pool.
#[derive(Clone)]
pub struct PgBackend {
    pool: DbPool,
}

impl PgBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl RuleRepository for PgBackend {
    async fn load_rules(
        &self,
        sheet_id: DbId,
        event: TriggerEvent,
    ) -> Result<Vec<AssignmentRule>, LookupError> {
        AssignmentRuleRepo::load_active(&self.pool, sheet_id, event)
            .await
            .map_err(|e| LookupError::unavailable(RULE_STORE, e))
    }

    async fn load_reassignment_rules(
        &self,
        sheet_id: DbId,
    ) -> Result<Vec<AssignmentRule>, LookupError> {
        AssignmentRuleRepo::load_reassignment_enabled(&self.pool, sheet_id)
            .await
            .map_err(|e| LookupError::unavailable(RULE_STORE, e))
    }

    async fn sheets_with_reassignment(&self) -> Result<Vec<DbId>, LookupError> {
        AssignmentRuleRepo::sheets_with_reassignment(&self.pool)
            .await
            .map_err(|e| LookupError::unavailable(RULE_STORE, e))
    }
}

#[async_trait]
impl WorkloadQuery for PgBackend {
    async fn count_open_items(&self, staff_id: DbId) -> Result<i64, LookupError> {
        WorkItemRepo::count_open_for_assignee(&self.pool, staff_id)
            .await
            .map_err(|e| LookupError::unavailable("workload query", e))
    }
}

#[async_trait]
impl StaffDirectory for PgBackend {
    async fn find_staff(&self, filter: &StaffFilter) -> Result<Option<StaffMember>, LookupError> {
        let row = StaffRepo::find_first_active(
            &self.pool,
            filter.role.as_deref(),
            &filter.required_skills,
            filter.exclude_id,
        )
        .await
        .map_err(|e| LookupError::unavailable(STAFF_DIRECTORY, e))?;
        Ok(row.map(StaffMember::from))
    }

    async fn list_staff(&self, ids: &[DbId]) -> Result<Vec<StaffMember>, LookupError> {
        let rows = StaffRepo::list_by_ids(&self.pool, ids)
            .await
            .map_err(|e| LookupError::unavailable(STAFF_DIRECTORY, e))?;
        Ok(rows.into_iter().map(StaffMember::from).collect())
    }

    async fn find_superior(
        &self,
        staff_id: DbId,
        kind: SuperiorKind,
    ) -> Result<Option<StaffMember>, LookupError> {
        let Some(member) = StaffRepo::find_by_id(&self.pool, staff_id)
            .await
            .map_err(|e| LookupError::unavailable(STAFF_DIRECTORY, e))?
        else {
            return Ok(None);
        };
        let superior_id = match kind {
            SuperiorKind::Manager => member.manager_id,
            SuperiorKind::Supervisor => member.supervisor_id,
        };
        let Some(superior_id) = superior_id else {
            return Ok(None);
        };
        let row = StaffRepo::find_by_id(&self.pool, superior_id)
            .await
            .map_err(|e| LookupError::unavailable(STAFF_DIRECTORY, e))?;
        Ok(row.map(StaffMember::from))
    }
}

#[async_trait]
impl RotationStore for PgBackend {
    async fn load_cursor(&self, rule_id: DbId) -> Result<Option<RotationCursor>, LookupError> {
        let row = RotationCursorRepo::find(&self.pool, rule_id)
            .await
            .map_err(|e| LookupError::unavailable("rotation store", e))?;
        Ok(row.map(RotationCursor::from))
    }
}

#[async_trait]
impl AssignmentStore for PgBackend {
    async fn commit(&self, commit: &AssignmentCommit) -> Result<(), PersistenceError> {
        let input = CommitAssignment {
            work_item_id: commit.work_item_id,
            rule_id: commit.rule_id,
            assignee_id: commit.assignee_id,
            assignments_delta: commit.delta.assignments,
            reassignments_delta: commit.delta.reassignments,
            applied_at: commit.applied_at,
            cursor: commit.rotation.map(|r| CursorAdvance {
                expected: r.expected,
                next: r.next,
            }),
            expected_item: commit.expected_item.map(|snapshot| ItemGuard {
                assignee_id: snapshot.assignee_id,
                last_activity_at: snapshot.last_activity_at,
            }),
        };

        match AssignmentCommitRepo::commit(&self.pool, &input).await? {
            CommitResult::Committed => Ok(()),
            CommitResult::CursorConflict => Err(PersistenceError::CursorConflict {
                rule_id: commit.rule_id,
            }),
            CommitResult::WorkItemMissing => {
                Err(PersistenceError::ItemNotFound(commit.work_item_id))
            }
            CommitResult::ItemChanged => Err(PersistenceError::ItemChanged(commit.work_item_id)),
            CommitResult::RuleMissing => Err(PersistenceError::RuleNotFound(commit.rule_id)),
        }
    }
}

#[async_trait]
impl WorkItemSource for PgBackend {
    async fn pending_items_for_rule(&self, rule_id: DbId) -> Result<Vec<WorkItem>, LookupError> {
        WorkItemRepo::list_pending_for_rule(&self.pool, rule_id)
            .await
            .map_err(|e| LookupError::unavailable(WORK_ITEMS, e))
    }
}
