//! fleetgrid-workspace — filesystem state for templates and instances.
//!
//! Everything the orchestrator knows about durable state lives under one
//! system root:
//!
//! ```text
//! <root>/templates/<name>/template.yml   # template spec
//! <root>/templates/<name>/...            # template payload
//! <root>/tmp/<instance>/...              # cloned instance payload
//! <root>/tmp/<instance>/server.properties
//! <root>/config.yml
//! ```
//!
//! There is no caching: listings and spec loads hit the disk on every call
//! so that live state can always be rebuilt from the inventory.

pub mod error;
pub mod paths;
pub mod properties;
pub mod templates;

pub use error::{WorkspaceError, WorkspaceResult};
pub use paths::FleetPaths;
pub use templates::TemplateStore;
