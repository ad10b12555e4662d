//! Error types for the ntuplizer

use thiserror::Error;
use crate::types::ColumnKind;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at construction or while processing one event
#[derive(Error, Debug)]
pub enum Error {
    /// Selection or preselection expression failed to compile
    #[error("Selection error: {0}")]
    Selection(#[from] SelectorError),

    /// Configuration rejected before any event was processed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input collection absent from the event
    #[error("Missing {kind} collection '{label}'")]
    MissingCollection { kind: &'static str, label: String },

    /// Truth association map absent from the event
    #[error("Missing truth record: {0}")]
    MissingTruthRecord(String),

    /// Table builder contract violated
    #[error("Table contract violation: {0}")]
    Table(#[from] TableError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Truth map for `label` is absent
    pub fn missing_truth_map(label: &str) -> Self {
        Error::MissingTruthRecord(format!("no association map '{}'", label))
    }

    /// Was the event's input incomplete (as opposed to a broken pipeline)?
    pub fn is_fetch_error(&self) -> bool {
        matches!(self, Error::MissingCollection { .. } | Error::MissingTruthRecord(_))
    }
}

/// Selection expression compile errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectorError {
    #[error("unexpected character at offset {offset} in '{expr}'")]
    BadCharacter { expr: String, offset: usize },

    #[error("unexpected {found} in '{expr}'")]
    UnexpectedToken { expr: String, found: String },

    #[error("unknown {kind} feature '{name}'")]
    UnknownFeature { kind: &'static str, name: String },

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' takes {expected} argument(s), got {got}")]
    Arity { name: String, expected: usize, got: usize },
}

/// Table builder contract violations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("column '{name}' has {got} values, table has {expected} rows")]
    LengthMismatch { name: String, expected: usize, got: usize },

    #[error("column '{0}' already present")]
    DuplicateColumn(String),

    #[error("column '{name}' declared {expected}, got a {got} value")]
    KindMismatch { name: String, expected: ColumnKind, got: ColumnKind },

    #[error("row has {got} values, layout has {expected} columns")]
    RowWidth { expected: usize, got: usize },

    #[error("cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: &'static str },
}
