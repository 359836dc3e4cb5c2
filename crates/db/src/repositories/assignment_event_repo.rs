//! Repository for the `assignment_events` audit log.

use rowdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::assignment_event::{AssignmentEventRow, CreateAssignmentEvent};

/// Column list for assignment_events queries.
const COLUMNS: &str = "id, event_type, work_item_id, rule_id, assignee_id, \
    previous_assignee_id, payload, occurred_at, created_at";

/// Append-only access to the assignment audit log.
pub struct AssignmentEventRepo;

impl AssignmentEventRepo {
    /// Insert an event, returning its ID.
    pub async fn insert(
        pool: &PgPool,
        input: &CreateAssignmentEvent<'_>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "INSERT INTO assignment_events
                (event_type, work_item_id, rule_id, assignee_id, previous_assignee_id,
                 payload, occurred_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
        )
        .bind(input.event_type)
        .bind(input.work_item_id)
        .bind(input.rule_id)
        .bind(input.assignee_id)
        .bind(input.previous_assignee_id)
        .bind(input.payload)
        .bind(input.occurred_at)
        .fetch_one(pool)
        .await
    }

    /// Events recorded for a work item, newest first.
    pub async fn list_for_work_item(
        pool: &PgPool,
        work_item_id: DbId,
    ) -> Result<Vec<AssignmentEventRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assignment_events
             WHERE work_item_id = $1
             ORDER BY occurred_at DESC, id DESC"
        );
        sqlx::query_as::<_, AssignmentEventRow>(&query)
            .bind(work_item_id)
            .fetch_all(pool)
            .await
    }
}
