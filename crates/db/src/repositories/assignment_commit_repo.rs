//! Transactional commit of an assignment outcome.
//!
//! The rotation cursor advance, the work item's assignee fields, and the
//! rule's statistics are written in one transaction. If any step fails the
//! transaction is dropped and nothing is applied.

use rowdesk_core::types::{DbId, Timestamp};
use sqlx::PgPool;

/// Compare-and-swap instruction for a round-robin cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorAdvance {
    /// The `last_index` observed when the slot was selected; `None` if the
    /// rule had no cursor yet.
    pub expected: Option<i32>,
    pub next: i32,
}

/// The work item state a commit expects to overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemGuard {
    pub assignee_id: Option<DbId>,
    pub last_activity_at: Timestamp,
}

/// Everything one assignment writes.
#[derive(Debug, Clone)]
pub struct CommitAssignment {
    pub work_item_id: DbId,
    pub rule_id: DbId,
    pub assignee_id: DbId,
    pub assignments_delta: i64,
    pub reassignments_delta: i64,
    pub applied_at: Timestamp,
    pub cursor: Option<CursorAdvance>,
    pub expected_item: Option<ItemGuard>,
}

/// Result of a commit attempt that reached the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitResult {
    Committed,
    /// Another writer moved the cursor since it was read.
    CursorConflict,
    /// The work item no longer matches `expected_item`.
    ItemChanged,
    WorkItemMissing,
    RuleMissing,
}

/// Writes assignment outcomes.
pub struct AssignmentCommitRepo;

impl AssignmentCommitRepo {
    pub async fn commit(
        pool: &PgPool,
        input: &CommitAssignment,
    ) -> Result<CommitResult, sqlx::Error> {
        let mut tx = pool.begin().await?;

        if let Some(cursor) = input.cursor {
            let swapped = match cursor.expected {
                None => sqlx::query(
                    "INSERT INTO rotation_cursors (rule_id, last_index, updated_at)
                     VALUES ($1, $2, $3)
                     ON CONFLICT (rule_id) DO NOTHING",
                )
                .bind(input.rule_id)
                .bind(cursor.next)
                .bind(input.applied_at)
                .execute(&mut *tx)
                .await?,
                Some(expected) => sqlx::query(
                    "UPDATE rotation_cursors SET last_index = $2, updated_at = $3
                     WHERE rule_id = $1 AND last_index = $4",
                )
                .bind(input.rule_id)
                .bind(cursor.next)
                .bind(input.applied_at)
                .bind(expected)
                .execute(&mut *tx)
                .await?,
            };
            if swapped.rows_affected() == 0 {
                return Ok(CommitResult::CursorConflict);
            }
        }

        let guard = input.expected_item;
        let item = sqlx::query(
            "UPDATE work_items SET
                assignee_id = $2,
                assignee_history = CASE
                    WHEN $2 = ANY(assignee_history) THEN assignee_history
                    ELSE array_append(assignee_history, $2)
                END,
                assignment_rule_id = $3,
                last_activity_at = $4,
                updated_at = NOW()
             WHERE id = $1
               AND (NOT $5
                    OR (assignee_id IS NOT DISTINCT FROM $6 AND last_activity_at = $7))",
        )
        .bind(input.work_item_id)
        .bind(input.assignee_id)
        .bind(input.rule_id)
        .bind(input.applied_at)
        .bind(guard.is_some())
        .bind(guard.and_then(|g| g.assignee_id))
        .bind(guard.map(|g| g.last_activity_at))
        .execute(&mut *tx)
        .await?;
        if item.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM work_items WHERE id = $1)",
            )
            .bind(input.work_item_id)
            .fetch_one(&mut *tx)
            .await?;
            return Ok(if exists {
                CommitResult::ItemChanged
            } else {
                CommitResult::WorkItemMissing
            });
        }

        let rule = sqlx::query(
            "UPDATE assignment_rules SET
                total_assignments = total_assignments + $2,
                total_reassignments = total_reassignments + $3,
                last_applied_at = $4
             WHERE id = $1",
        )
        .bind(input.rule_id)
        .bind(input.assignments_delta)
        .bind(input.reassignments_delta)
        .bind(input.applied_at)
        .execute(&mut *tx)
        .await?;
        if rule.rows_affected() == 0 {
            return Ok(CommitResult::RuleMissing);
        }

        tx.commit().await?;
        Ok(CommitResult::Committed)
    }
}
