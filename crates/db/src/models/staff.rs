//! Staff directory models.

use rowdesk_core::assignment::StaffMember;
use rowdesk_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `staff_members` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StaffMemberRow {
    pub id: DbId,
    pub name: String,
    pub role: String,
    pub is_active: bool,
    pub skills: Vec<String>,
    pub manager_id: Option<DbId>,
    pub supervisor_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<StaffMemberRow> for StaffMember {
    fn from(row: StaffMemberRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            role: row.role,
            is_active: row.is_active,
            skills: row.skills.into_iter().collect(),
            manager_id: row.manager_id,
            supervisor_id: row.supervisor_id,
        }
    }
}

/// DTO for creating a staff member.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStaffMember {
    pub name: String,
    pub role: String,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub manager_id: Option<DbId>,
    pub supervisor_id: Option<DbId>,
}
