//! Row structs and DTOs, one module per table.

pub mod assignment_event;
pub mod assignment_rule;
pub mod rotation_cursor;
pub mod staff;
pub mod work_item;

use serde::de::DeserializeOwned;

/// Decode a JSONB column into a typed value, reporting failures as
/// `sqlx::Error::ColumnDecode` so callers see which column was malformed.
pub(crate) fn decode_json<T: DeserializeOwned>(
    column: &str,
    value: serde_json::Value,
) -> Result<T, sqlx::Error> {
    serde_json::from_value(value).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Parse a TEXT enum column.
pub(crate) fn decode_text<T>(column: &str, value: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr<Err = rowdesk_core::error::CoreError>,
{
    value.parse().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// Encode a typed value for a JSONB column.
pub(crate) fn encode_json<T: serde::Serialize>(
    value: &T,
) -> Result<serde_json::Value, sqlx::Error> {
    serde_json::to_value(value).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}
