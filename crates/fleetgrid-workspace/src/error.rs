//! Error types for workspace operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for workspace operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Errors raised by template and instance filesystem operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("missing template config: {0}")]
    MissingConfig(PathBuf),

    #[error("empty template config: {0}")]
    EmptyConfig(PathBuf),

    #[error("missing '{0}' in template config")]
    MissingField(&'static str),

    #[error("invalid '{field}' value: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("failed to write template config: {0}")]
    Serialize(String),

    #[error("no launch jar found in {0}")]
    NoLaunchJar(PathBuf),
}
