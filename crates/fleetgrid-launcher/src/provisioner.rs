//! Provisioning — cloning templates into running instances.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use fleet_core::TemplateSpec;
use fleetgrid_process::ProcessController;
use fleetgrid_registry::LivenessRegistry;
use fleetgrid_workspace::{properties, FleetPaths, TemplateStore, WorkspaceError};

use crate::error::{LaunchError, LaunchResult};
use crate::ports::find_free_port;

/// Default first candidate for port allocation.
pub const DEFAULT_BASE_PORT: u16 = 25565;

/// Clones template payloads into instance directories, allocates ports,
/// launches workers and seeds the liveness registry.
#[derive(Clone)]
pub struct Provisioner {
    paths: FleetPaths,
    store: TemplateStore,
    process: Arc<dyn ProcessController>,
    registry: LivenessRegistry,
    base_port: u16,
}

impl Provisioner {
    pub fn new(
        paths: FleetPaths,
        store: TemplateStore,
        process: Arc<dyn ProcessController>,
        registry: LivenessRegistry,
    ) -> Self {
        Self {
            paths,
            store,
            process,
            registry,
            base_port: DEFAULT_BASE_PORT,
        }
    }

    /// Override the first port candidate (tests use high scratch ranges).
    pub fn with_base_port(mut self, base_port: u16) -> Self {
        self.base_port = base_port;
        self
    }

    /// Cold start: wipe the instance area and bring every template up to
    /// its configured minimum. Returns the number of instances launched.
    ///
    /// Any template with an unreadable spec or a non-positive RAM budget
    /// aborts the whole call; a cold start should not silently come up
    /// partial.
    pub fn start_all(&self) -> LaunchResult<usize> {
        self.paths.delete_tmp()?;
        self.paths.ensure_tmp()?;

        let templates = self.paths.list_templates()?;
        if templates.is_empty() {
            return Err(LaunchError::NoTemplates);
        }

        // One exclusion set across the whole call: allocated ports are not
        // listening yet, so the bind probe alone would hand them out twice.
        let mut claimed: HashSet<u16> = HashSet::new();
        let mut next_port = self.base_port;
        let mut launched = 0;

        for template in &templates {
            let spec = self.store.load(template)?;
            if spec.max_ram_mb <= 0 {
                return Err(LaunchError::InvalidMaxRam(template.clone()));
            }
            let count = spec.server_min.max(0);
            info!(%template, count, "starting template minimum");
            for index in 1..=count {
                let instance = format!("{template}-{index}");
                if self.paths.instance_exists(&instance) {
                    warn!(%instance, "instance directory already present, skipping");
                    continue;
                }
                self.paths.copy_template_to_instance(template, &instance)?;
                let port = find_free_port(next_port, &claimed)?;
                claimed.insert(port);
                next_port = port.saturating_add(1);
                self.launch(&instance, &spec, port)?;
                launched += 1;
            }
        }
        Ok(launched)
    }

    /// Launch one additional instance of `template` at the lowest unused
    /// index. Returns the new instance name.
    pub fn start_template_server(&self, template: &str) -> LaunchResult<String> {
        if !self.paths.template_exists(template) {
            return Err(WorkspaceError::TemplateNotFound(template.to_string()).into());
        }
        let spec = self.store.load(template)?;
        if spec.max_ram_mb <= 0 {
            return Err(LaunchError::InvalidMaxRam(template.to_string()));
        }

        self.paths.ensure_tmp()?;
        let instances = self.paths.list_instances()?;

        // Ports already declared by sibling instances are off the table
        // even when their workers are currently down.
        let claimed: HashSet<u16> = instances
            .iter()
            .filter_map(|name| {
                properties::read_declared_port(&self.paths.instance_dir(name))
            })
            .collect();

        let instance = self.next_instance_name(template, &instances);
        self.paths.copy_template_to_instance(template, &instance)?;
        let port = find_free_port(self.base_port, &claimed)?;
        self.launch(&instance, &spec, port)?;
        Ok(instance)
    }

    /// Lowest index ≥ 1 whose instance name is not taken.
    fn next_instance_name(&self, template: &str, instances: &[String]) -> String {
        let taken: HashSet<&str> = instances.iter().map(String::as_str).collect();
        let mut index = 1;
        loop {
            let candidate = format!("{template}-{index}");
            if !taken.contains(candidate.as_str()) {
                return candidate;
            }
            index += 1;
        }
    }

    fn launch(&self, instance: &str, spec: &TemplateSpec, port: u16) -> LaunchResult<()> {
        let dir = self.paths.instance_dir(instance);
        properties::patch_declared_port(&dir, port)?;
        let jar = properties::find_launch_jar(&dir)?;
        let jar_name = jar
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let ram = spec.max_ram_mb;
        let argv = vec![
            "java".to_string(),
            format!("-Xms{ram}M"),
            format!("-Xmx{ram}M"),
            "-jar".to_string(),
            jar_name,
        ];
        info!(%instance, port, ram, "launching instance");
        self.process.start(instance, &argv, &dir);
        self.registry.register(instance, spec.max_players);
        Ok(())
    }
}
