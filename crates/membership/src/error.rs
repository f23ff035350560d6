/// Validation failures raised by the membership rules
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Required field is empty: {0}")]
    MissingField(&'static str),

    #[error("Invalid extension period '{0}': expected <count><d|w|m|y>")]
    InvalidPeriod(String),

    #[error("Date arithmetic out of range")]
    DateOutOfRange,
}
