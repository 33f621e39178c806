use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a command. Row-level problems during a load are
/// reported through [`RowError`] instead and never surface here.
#[derive(Error, Debug)]
pub enum ExpensesError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Input header is missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Row {row} has no value for required column {column}")]
    ShortRow { row: usize, column: String },

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ExpensesError>;

/// Why a single input row was not stored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("{field}: {reason} (raw value {raw_value:?})")]
    Parse {
        field: String,
        raw_value: String,
        reason: String,
    },

    #[error("not stored: {reason}")]
    Persist { reason: String },
}

impl RowError {
    pub fn parse(field: impl Into<String>, raw_value: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            field: field.into(),
            raw_value: raw_value.to_string(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field, or `None` for persistence failures.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Parse { field, .. } => Some(field),
            Self::Persist { .. } => None,
        }
    }
}
