use thiserror::Error;

/// Typed failures of the individual tools. Application plumbing wraps these in `anyhow`.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown issue category: {0}")]
    UnknownCategory(String),

    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("Fix range {start}..{end} is not valid for text of {len} bytes")]
    InvalidFixRange { start: usize, end: usize, len: usize },

    #[error("Parsing errors: {}", .0.join(", "))]
    Csv(Vec<String>),

    #[error("Unknown conversion category: {0}")]
    UnknownConversionCategory(String),

    #[error("Unknown {category} unit: {unit}")]
    UnknownUnit { category: String, unit: String },

    #[error("Value is not a finite number: {0}")]
    NonFiniteValue(f64),

    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid date, expected YYYY-MM-DD: {0}")]
    InvalidDate(String),

    #[error("Invalid time, expected HH:MM or HH:MM:SS: {0}")]
    InvalidTime(String),

    #[error("Birth date is in the future: {0}")]
    BirthInFuture(String),

    #[error("Date is outside the supported range")]
    DateOutOfRange,

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("No tool mounted at: {0}")]
    UnknownTool(String),
}
