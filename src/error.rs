use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Missing required columns: {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Non-fatal data quality findings collected while cleaning.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    InvalidPincode { row: usize, value: String },
    UnparsedDate { row: usize, value: String },
    MissingCount { row: usize, column: &'static str },
    ExcessiveCount { column: &'static str, rows: usize, ceiling: u64 },
    ConflictingState { district: String, pincode: String, kept: String, dropped: String },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::InvalidPincode { row, value } => {
                write!(f, "row {}: invalid PIN code '{}'", row, value)
            }
            ValidationWarning::UnparsedDate { row, value } => {
                write!(f, "row {}: could not parse date '{}'", row, value)
            }
            ValidationWarning::MissingCount { row, column } => {
                write!(f, "row {}: missing {} filled with 0", row, column)
            }
            ValidationWarning::ExcessiveCount { column, rows, ceiling } => {
                write!(f, "{} records with {} > {}", rows, column, ceiling)
            }
            ValidationWarning::ConflictingState { district, pincode, kept, dropped } => write!(
                f,
                "{}/{}: state '{}' kept over '{}'",
                district, pincode, kept, dropped
            ),
        }
    }
}

/// Everything the cleaning stage noticed but did not act on.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub date_format: Option<&'static str>,
    pub unparsed_dates: usize,
    pub invalid_pincodes: usize,
    pub missing_counts: usize,
    pub duplicate_rows: usize,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn push(&mut self, warning: ValidationWarning) {
        log::debug!("{}", warning);
        self.warnings.push(warning);
    }
}
