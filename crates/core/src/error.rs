/// Errors raised by the pure domain layer.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed input, such as an unknown status string or a blank rule name.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A rule describes a strategy/pool combination that can never assign anyone.
    #[error("Invalid rule configuration: {0}")]
    Configuration(String),
}
