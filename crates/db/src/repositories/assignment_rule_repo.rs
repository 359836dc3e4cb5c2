//! Repository for the `assignment_rules` table.

use rowdesk_core::assignment::validation::validate_rule_definition;
use rowdesk_core::assignment::{AssignmentRule, RuleStatus, TriggerEvent};
use rowdesk_core::error::CoreError;
use rowdesk_core::types::DbId;
use sqlx::PgPool;

use crate::models::assignment_rule::{
    AssignmentRuleRow, CreateAssignmentRule, UpdateAssignmentRule,
};
use crate::models::encode_json;

/// Column list for assignment_rules queries.
const COLUMNS: &str = "id, sheet_id, name, status, priority, trigger_event, conditions, \
    strategy, reassignment, notifications, total_assignments, total_reassignments, \
    last_applied_at, created_at, updated_at";

/// Evaluation order: priority descending, older rules first, id as final tie-break.
const EVALUATION_ORDER: &str = "priority DESC, created_at ASC, id ASC";

/// Failure of a rule create or update.
#[derive(Debug, thiserror::Error)]
pub enum RuleWriteError {
    /// The definition was rejected before anything was written.
    #[error(transparent)]
    Invalid(CoreError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Provides CRUD and engine lookups for assignment rules.
pub struct AssignmentRuleRepo;

impl AssignmentRuleRepo {
    /// Validate and insert a new rule, returning the created row.
    ///
    /// An invalid definition is rejected with [`RuleWriteError::Invalid`]
    /// before touching the database.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAssignmentRule,
    ) -> Result<AssignmentRuleRow, RuleWriteError> {
        validate_rule_definition(
            &input.name,
            &input.conditions,
            &input.strategy,
            &input.reassignment,
        )
        .map_err(RuleWriteError::Invalid)?;

        let query = format!(
            "INSERT INTO assignment_rules
                (sheet_id, name, status, priority, trigger_event, conditions, strategy,
                 reassignment, notifications)
             VALUES ($1, $2, $3, COALESCE($4, 0), $5, $6, $7, $8, COALESCE($9, '{{}}'))
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, AssignmentRuleRow>(&query)
            .bind(input.sheet_id)
            .bind(&input.name)
            .bind(input.status.unwrap_or(RuleStatus::Active).as_str())
            .bind(input.priority)
            .bind(input.event.as_str())
            .bind(encode_json(&input.conditions)?)
            .bind(encode_json(&input.strategy)?)
            .bind(encode_json(&input.reassignment)?)
            .bind(&input.notifications)
            .fetch_one(pool)
            .await?;
        Ok(row)
    }

    /// Update a rule. Only non-`None` fields in `input` are applied; the
    /// merged definition is validated before writing.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAssignmentRule,
    ) -> Result<Option<AssignmentRuleRow>, RuleWriteError> {
        let Some(existing) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let existing = existing.into_rule()?;

        let name = input.name.as_ref().unwrap_or(&existing.name);
        let conditions = input.conditions.as_ref().unwrap_or(&existing.conditions);
        let strategy = input.strategy.as_ref().unwrap_or(&existing.strategy);
        let reassignment = input.reassignment.as_ref().unwrap_or(&existing.reassignment);
        validate_rule_definition(name, conditions, strategy, reassignment)
            .map_err(RuleWriteError::Invalid)?;

        let query = format!(
            "UPDATE assignment_rules SET
                name = $2,
                priority = COALESCE($3, priority),
                trigger_event = COALESCE($4, trigger_event),
                conditions = $5,
                strategy = $6,
                reassignment = $7,
                notifications = COALESCE($8, notifications),
                updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, AssignmentRuleRow>(&query)
            .bind(id)
            .bind(name)
            .bind(input.priority)
            .bind(input.event.map(TriggerEvent::as_str))
            .bind(encode_json(conditions)?)
            .bind(encode_json(strategy)?)
            .bind(encode_json(reassignment)?)
            .bind(&input.notifications)
            .fetch_optional(pool)
            .await?;
        Ok(row)
    }

    /// Activate, deactivate, or archive a rule. Returns `false` if not found.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: RuleStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE assignment_rules SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find a rule by its ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AssignmentRuleRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM assignment_rules WHERE id = $1");
        sqlx::query_as::<_, AssignmentRuleRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List every rule of a sheet regardless of status, in evaluation order.
    pub async fn list_by_sheet(
        pool: &PgPool,
        sheet_id: DbId,
    ) -> Result<Vec<AssignmentRuleRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assignment_rules
             WHERE sheet_id = $1
             ORDER BY {EVALUATION_ORDER}"
        );
        sqlx::query_as::<_, AssignmentRuleRow>(&query)
            .bind(sheet_id)
            .fetch_all(pool)
            .await
    }

    /// Load the active rules of a sheet for one trigger event, in evaluation order.
    pub async fn load_active(
        pool: &PgPool,
        sheet_id: DbId,
        event: TriggerEvent,
    ) -> Result<Vec<AssignmentRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assignment_rules
             WHERE sheet_id = $1 AND trigger_event = $2 AND status = 'active'
             ORDER BY {EVALUATION_ORDER}"
        );
        let rows = sqlx::query_as::<_, AssignmentRuleRow>(&query)
            .bind(sheet_id)
            .bind(event.as_str())
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(AssignmentRuleRow::into_rule).collect()
    }

    /// Load the active rules of a sheet whose reassignment policy is enabled.
    pub async fn load_reassignment_enabled(
        pool: &PgPool,
        sheet_id: DbId,
    ) -> Result<Vec<AssignmentRule>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM assignment_rules
             WHERE sheet_id = $1
               AND status = 'active'
               AND (reassignment ->> 'enabled')::boolean IS TRUE
             ORDER BY {EVALUATION_ORDER}"
        );
        let rows = sqlx::query_as::<_, AssignmentRuleRow>(&query)
            .bind(sheet_id)
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(AssignmentRuleRow::into_rule).collect()
    }

    /// Sheets that have at least one active rule with reassignment enabled.
    pub async fn sheets_with_reassignment(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT DISTINCT sheet_id FROM assignment_rules
             WHERE status = 'active'
               AND (reassignment ->> 'enabled')::boolean IS TRUE
             ORDER BY sheet_id",
        )
        .fetch_all(pool)
        .await
    }
}
