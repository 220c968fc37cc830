//! Error types for provisioning and decommissioning.

use thiserror::Error;

use fleetgrid_workspace::WorkspaceError;

/// Result type alias for launcher operations.
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Errors that abort a provisioning or decommissioning operation.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error("no templates found; add a template first")]
    NoTemplates,

    #[error("invalid maxRamMb for template: {0}")]
    InvalidMaxRam(String),

    #[error("no free ports available")]
    PortsExhausted,
}
