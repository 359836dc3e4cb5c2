//! Repository for the `staff_members` table.

use rowdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::staff::{CreateStaffMember, StaffMemberRow};

/// Column list for staff_members queries.
const COLUMNS: &str =
    "id, name, role, is_active, skills, manager_id, supervisor_id, created_at, updated_at";

/// Provides directory lookups over staff members.
pub struct StaffRepo;

impl StaffRepo {
    /// Insert a new staff member, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateStaffMember,
    ) -> Result<StaffMemberRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO staff_members (name, role, is_active, skills, manager_id, supervisor_id)
             VALUES ($1, $2, COALESCE($3, true), $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, StaffMemberRow>(&query)
            .bind(&input.name)
            .bind(&input.role)
            .bind(input.is_active)
            .bind(&input.skills)
            .bind(input.manager_id)
            .bind(input.supervisor_id)
            .fetch_one(pool)
            .await
    }

    /// Find a staff member by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<StaffMemberRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM staff_members WHERE id = $1");
        sqlx::query_as::<_, StaffMemberRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the given staff members, ordered by ID. Unknown IDs are skipped.
    pub async fn list_by_ids(
        pool: &PgPool,
        ids: &[DbId],
    ) -> Result<Vec<StaffMemberRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM staff_members WHERE id = ANY($1) ORDER BY id"
        );
        sqlx::query_as::<_, StaffMemberRow>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// First active member matching an optional role and holding every listed
    /// skill, lowest ID first. `exclude_id` is never returned.
    pub async fn find_first_active(
        pool: &PgPool,
        role: Option<&str>,
        required_skills: &[String],
        exclude_id: Option<DbId>,
    ) -> Result<Option<StaffMemberRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM staff_members
             WHERE is_active
               AND ($1::text IS NULL OR role = $1)
               AND skills @> $2::text[]
               AND ($3::bigint IS NULL OR id <> $3)
             ORDER BY id
             LIMIT 1"
        );
        sqlx::query_as::<_, StaffMemberRow>(&query)
            .bind(role)
            .bind(required_skills)
            .bind(exclude_id)
            .fetch_optional(pool)
            .await
    }

    /// Deactivate a staff member. Returns `false` if not found.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE staff_members SET is_active = false, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
