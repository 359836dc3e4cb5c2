/// Sheet, rule, work item, and staff ids are PostgreSQL BIGSERIAL keys.
pub type DbId = i64;

/// UTC instant used for activity tracking and rule statistics.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
