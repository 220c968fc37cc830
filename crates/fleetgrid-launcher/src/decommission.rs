//! Decommissioning — stopping workers and reclaiming their directories.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use fleetgrid_process::ProcessController;
use fleetgrid_registry::LivenessRegistry;
use fleetgrid_workspace::FleetPaths;

use crate::error::LaunchResult;

/// Default delay between stopping a worker and deleting its directory,
/// giving the process time to release file handles.
pub const DEFAULT_GRACE_DELAY: Duration = Duration::from_secs(5);

/// Tears instances down: stop the worker, drop its registry entry, wait
/// out the grace delay, then delete the directory.
#[derive(Clone)]
pub struct Decommissioner {
    paths: FleetPaths,
    process: Arc<dyn ProcessController>,
    registry: LivenessRegistry,
    grace: Duration,
}

impl Decommissioner {
    pub fn new(
        paths: FleetPaths,
        process: Arc<dyn ProcessController>,
        registry: LivenessRegistry,
    ) -> Self {
        Self {
            paths,
            process,
            registry,
            grace: DEFAULT_GRACE_DELAY,
        }
    }

    /// Override the grace delay (tests use zero).
    pub fn with_grace_delay(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Stop one instance and delete its directory. Returns `false` when no
    /// such instance exists; nothing is stopped in that case.
    pub async fn stop(&self, name: &str) -> LaunchResult<bool> {
        if !self.paths.instance_exists(name) {
            return Ok(false);
        }
        info!(instance = %name, "decommissioning instance");
        self.process.stop(name);
        self.registry.remove(name);
        sleep(self.grace).await;
        self.paths.delete_instance(name)?;
        Ok(true)
    }

    /// Stop every instance and wipe the instance area. Returns the number
    /// of instances stopped. With nothing running this returns 0 and
    /// touches neither a worker nor the filesystem.
    pub async fn stop_all(&self) -> LaunchResult<usize> {
        let instances = self.paths.list_instances()?;
        if instances.is_empty() {
            return Ok(0);
        }
        info!(count = instances.len(), "decommissioning all instances");
        for name in &instances {
            self.process.stop(name);
            self.registry.remove(name);
        }
        sleep(self.grace).await;
        self.paths.delete_tmp()?;
        Ok(instances.len())
    }
}
