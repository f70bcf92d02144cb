//! Error types for rgview.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RgviewError {
    #[error("process spawn failed: {0}")]
    ProcessSpawnFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid session state: expected {expected}, got {actual}")]
    InvalidSessionState { expected: String, actual: String },

    #[error("session is running; edits are disabled until the search stops")]
    SessionBusy,

    #[error("row {0} has no associated source line")]
    RowNotEditable(usize),

    #[error("column {0} falls inside the line-number gutter")]
    ColumnInGutter(usize),

    #[error("edit target {file}:{line} is out of range")]
    TargetOutOfRange { file: String, line: u64 },

    #[error("file not open in store: {0}")]
    FileNotOpen(String),

    #[error("type catalog query failed: {0}")]
    TypeCatalog(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
