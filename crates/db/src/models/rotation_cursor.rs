//! Round-robin rotation cursor model.

use rowdesk_core::assignment::rotation::RotationCursor;
use rowdesk_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `rotation_cursors` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RotationCursorRow {
    pub rule_id: DbId,
    pub last_index: i32,
    pub updated_at: Timestamp,
}

impl From<RotationCursorRow> for RotationCursor {
    fn from(row: RotationCursorRow) -> Self {
        Self {
            rule_id: row.rule_id,
            last_index: row.last_index,
            updated_at: row.updated_at,
        }
    }
}
