//! fleetgrid-launcher — turning templates into running instances and back.
//!
//! The `Provisioner` owns the create path (copy payload, allocate a port,
//! patch the network config, launch the worker, register liveness); the
//! `Decommissioner` owns the delete path (stop the worker, wait out a
//! grace delay, remove the directory). Port allocation lives here too:
//! candidates are scanned sequentially and verified with a bind-then-
//! release probe.

pub mod decommission;
pub mod error;
pub mod ports;
pub mod provisioner;

pub use decommission::Decommissioner;
pub use error::{LaunchError, LaunchResult};
pub use provisioner::Provisioner;
