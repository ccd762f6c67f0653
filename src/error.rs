use std::path::PathBuf;
use thiserror::Error;

/// Everything that can abort a report run.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Input file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse table {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Table {} has no header row", path.display())]
    EmptyTable { path: PathBuf },

    #[error("Column '{column}' not found (available: {})", available.join(", "))]
    KeyMissing {
        column: String,
        available: Vec<String>,
    },

    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Requested {requested} rows but the table only has {available}")]
    ShortInput { requested: usize, available: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, ReportError>;
