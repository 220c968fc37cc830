//! fleetgrid-process — starting, stopping, and listing worker processes.
//!
//! Process control is best-effort by contract: the orchestrator's
//! decisions must not hinge on whether an individual `start` or `stop`
//! succeeded (a crashed worker's session is already gone when we try to
//! stop it). Failures are logged and swallowed; `list` degrades to empty.
//!
//! `ProcessController` is a capability trait so the provisioner and
//! renewal loop stay independent of the concrete mechanism — the shipped
//! implementation uses detached GNU screen sessions, but containerized or
//! remote-agent variants slot in behind the same interface.

pub mod screen;

use std::path::Path;

pub use screen::ScreenController;

/// Capability interface over OS-level worker processes, keyed by instance
/// name. All operations are best-effort.
pub trait ProcessController: Send + Sync {
    /// Launch a worker with the given argv in the given working directory.
    fn start(&self, name: &str, argv: &[String], working_dir: &Path);

    /// Terminate the worker's session.
    fn stop(&self, name: &str);

    /// Names of currently running worker sessions. Empty on any failure.
    fn list(&self) -> Vec<String>;

    /// Attach the calling terminal to a worker session (interactive).
    fn attach(&self, name: &str);
}
