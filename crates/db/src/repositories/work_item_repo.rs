//! Repository for the `work_items` table.

use rowdesk_core::assignment::{ItemStatus, WorkItem};
use rowdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::work_item::{CreateWorkItem, WorkItemRow};

/// Column list for work_items queries.
const COLUMNS: &str = "id, sheet_id, status, priority, tags, custom_fields, assignee_id, \
    assignee_history, assignment_rule_id, creator_id, last_activity_at, pending_since, \
    created_at, updated_at";

/// SQL list of statuses that count as open workload.
const OPEN_STATUSES: &str = "('draft', 'pending_review', 'returned')";

/// Provides the work item reads the assignment engine needs.
pub struct WorkItemRepo;

impl WorkItemRepo {
    /// Insert a new work item, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateWorkItem) -> Result<WorkItemRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO work_items
                (sheet_id, status, priority, tags, custom_fields, creator_id,
                 last_activity_at, pending_since)
             VALUES ($1, COALESCE($2, 'draft'), COALESCE($3, 'normal'), $4,
                     COALESCE($5, '{{}}'), $6, COALESCE($7, NOW()), $8)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, WorkItemRow>(&query)
            .bind(input.sheet_id)
            .bind(input.status.map(ItemStatus::as_str))
            .bind(&input.priority)
            .bind(&input.tags)
            .bind(&input.custom_fields)
            .bind(input.creator_id)
            .bind(input.last_activity_at)
            .bind(input.pending_since)
            .fetch_one(pool)
            .await
    }

    /// Find a work item by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<WorkItemRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM work_items WHERE id = $1");
        sqlx::query_as::<_, WorkItemRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Number of open items currently assigned to a staff member.
    pub async fn count_open_for_assignee(
        pool: &PgPool,
        staff_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let query = format!(
            "SELECT COUNT(*) FROM work_items
             WHERE assignee_id = $1 AND status IN {OPEN_STATUSES}"
        );
        sqlx::query_scalar::<_, i64>(&query)
            .bind(staff_id)
            .fetch_one(pool)
            .await
    }

    /// Pending items whose current assignment came from `rule_id`, oldest first.
    pub async fn list_pending_for_rule(
        pool: &PgPool,
        rule_id: DbId,
    ) -> Result<Vec<WorkItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM work_items
             WHERE assignment_rule_id = $1 AND status = 'pending_review'
             ORDER BY last_activity_at ASC, id ASC"
        );
        let rows = sqlx::query_as::<_, WorkItemRow>(&query)
            .bind(rule_id)
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(WorkItemRow::into_item).collect()
    }
}
