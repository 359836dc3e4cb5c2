//! Repository for the `rotation_cursors` table.

use rowdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::rotation_cursor::RotationCursorRow;

/// Read access to round-robin cursors. Writes happen inside
/// [`AssignmentCommitRepo::commit`](super::AssignmentCommitRepo::commit).
pub struct RotationCursorRepo;

impl RotationCursorRepo {
    /// Fetch the cursor of a rule, if the rule has ever assigned through rotation.
    pub async fn find(
        pool: &PgPool,
        rule_id: DbId,
    ) -> Result<Option<RotationCursorRow>, sqlx::Error> {
        sqlx::query_as::<_, RotationCursorRow>(
            "SELECT rule_id, last_index, updated_at FROM rotation_cursors WHERE rule_id = $1",
        )
        .bind(rule_id)
        .fetch_optional(pool)
        .await
    }

    /// Drop a rule's cursor so its rotation restarts at the first pool entry.
    pub async fn reset(pool: &PgPool, rule_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rotation_cursors WHERE rule_id = $1")
            .bind(rule_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
