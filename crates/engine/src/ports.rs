//! Collaborator interfaces the engine depends on.
//!
//! Every external lookup and every write goes through one of these traits so
//! that PostgreSQL ([`crate::postgres`]) and in-memory ([`crate::memory`])
//! backends are interchangeable.

use std::sync::Arc;

use async_trait::async_trait;
use rowdesk_core::assignment::rotation::RotationCursor;
use rowdesk_core::assignment::{AssignmentRule, StaffMember, TriggerEvent, WorkItem};
use rowdesk_core::types::{DbId, Timestamp};

use crate::error::{LookupError, PersistenceError};

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Directory query. Matching members are returned lowest id first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaffFilter {
    pub role: Option<String>,
    pub required_skills: Vec<String>,
    pub exclude_id: Option<DbId>,
}

/// Which superior a stale item escalates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperiorKind {
    Manager,
    Supervisor,
}

/// Counter increments applied to a rule by one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsDelta {
    pub assignments: i64,
    pub reassignments: i64,
}

impl StatisticsDelta {
    pub const ASSIGNMENT: Self = Self {
        assignments: 1,
        reassignments: 0,
    };
    pub const REASSIGNMENT: Self = Self {
        assignments: 0,
        reassignments: 1,
    };
}

/// Compare-and-swap of a rule's rotation cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationAdvance {
    /// `last_index` observed at selection time; `None` if no cursor existed.
    pub expected: Option<i32>,
    pub next: i32,
}

/// The assignee and activity time a caller observed on a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSnapshot {
    pub assignee_id: Option<DbId>,
    pub last_activity_at: Timestamp,
}

impl ItemSnapshot {
    pub fn of(item: &WorkItem) -> Self {
        Self {
            assignee_id: item.assignee_id,
            last_activity_at: item.last_activity_at,
        }
    }
}

/// One atomic unit: assignee write, statistics bump, and rotation advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentCommit {
    pub work_item_id: DbId,
    pub rule_id: DbId,
    pub assignee_id: DbId,
    pub delta: StatisticsDelta,
    pub applied_at: Timestamp,
    pub rotation: Option<RotationAdvance>,
    /// When set, the commit applies only if the stored item still matches.
    pub expected_item: Option<ItemSnapshot>,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Active rules of a sheet for one event, priority descending then
    /// creation ascending.
    async fn load_rules(
        &self,
        sheet_id: DbId,
        event: TriggerEvent,
    ) -> Result<Vec<AssignmentRule>, LookupError>;

    /// Active rules of a sheet with reassignment enabled.
    async fn load_reassignment_rules(
        &self,
        sheet_id: DbId,
    ) -> Result<Vec<AssignmentRule>, LookupError>;

    /// Sheets the sweeper has work to do on.
    async fn sheets_with_reassignment(&self) -> Result<Vec<DbId>, LookupError>;
}

#[async_trait]
pub trait WorkloadQuery: Send + Sync {
    /// Number of open items currently assigned to `staff_id`.
    async fn count_open_items(&self, staff_id: DbId) -> Result<i64, LookupError>;
}

#[async_trait]
pub trait StaffDirectory: Send + Sync {
    /// First active member matching `filter`, lowest id first.
    async fn find_staff(&self, filter: &StaffFilter) -> Result<Option<StaffMember>, LookupError>;

    /// The listed members that exist, in any order.
    async fn list_staff(&self, ids: &[DbId]) -> Result<Vec<StaffMember>, LookupError>;

    /// The manager or supervisor on record for `staff_id`.
    async fn find_superior(
        &self,
        staff_id: DbId,
        kind: SuperiorKind,
    ) -> Result<Option<StaffMember>, LookupError>;
}

#[async_trait]
pub trait RotationStore: Send + Sync {
    async fn load_cursor(&self, rule_id: DbId) -> Result<Option<RotationCursor>, LookupError>;
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Apply `commit` atomically. On any error nothing is applied, including
    /// the rotation advance. A stored item that no longer matches
    /// `commit.expected_item` fails with [`PersistenceError::ItemChanged`].
    async fn commit(&self, commit: &AssignmentCommit) -> Result<(), PersistenceError>;
}

#[async_trait]
pub trait WorkItemSource: Send + Sync {
    /// Pending items whose current assignment came from `rule_id`.
    async fn pending_items_for_rule(&self, rule_id: DbId) -> Result<Vec<WorkItem>, LookupError>;
}

/// The full set of collaborators, shared behind `Arc`s.
#[derive(Clone)]
pub struct Collaborators {
    pub rules: Arc<dyn RuleRepository>,
    pub workload: Arc<dyn WorkloadQuery>,
    pub directory: Arc<dyn StaffDirectory>,
    pub rotation: Arc<dyn RotationStore>,
    pub store: Arc<dyn AssignmentStore>,
    pub items: Arc<dyn WorkItemSource>,
}

impl Collaborators {
    /// Use one backend for every collaborator role.
    pub fn shared<B>(backend: Arc<B>) -> Self
    where
        B: RuleRepository
            + WorkloadQuery
            + StaffDirectory
            + RotationStore
            + AssignmentStore
            + WorkItemSource
            + 'static,
    {
        Self {
            rules: backend.clone(),
            workload: backend.clone(),
            directory: backend.clone(),
            rotation: backend.clone(),
            store: backend.clone(),
            items: backend,
        }
    }
}
