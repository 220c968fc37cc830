//! fleetgrid-renewal — the periodic reconcile loop.
//!
//! Each tick takes one status snapshot and reacts to it three ways:
//!
//! 1. Crash detection: an instance that was online last tick and is
//!    offline now gets stopped, deregistered and deleted, then replaced
//!    when its template falls below its minimum.
//! 2. Registry hygiene: entries absent from this tick's snapshot are
//!    pruned; a pusher with no backing directory survives while fresh and
//!    is removed through the crash path once its data goes stale.
//! 3. Demand scaling: a template whose instances are all at player
//!    capacity gets one more instance, up to its configured cap.
//!
//! The loop never scales by more than one instance per template per tick;
//! sustained demand is absorbed over consecutive ticks.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use fleet_core::ServerStatus;
use fleetgrid_launcher::Provisioner;
use fleetgrid_process::ProcessController;
use fleetgrid_registry::LivenessRegistry;
use fleetgrid_status::StatusAggregator;
use fleetgrid_workspace::{FleetPaths, TemplateStore};

/// Drives crash recovery and demand scaling off periodic status snapshots.
pub struct RenewalController {
    paths: FleetPaths,
    store: TemplateStore,
    aggregator: StatusAggregator,
    provisioner: Provisioner,
    process: Arc<dyn ProcessController>,
    registry: LivenessRegistry,
    /// Online flag per instance as of the previous tick. A crash is the
    /// true→false transition; an instance that has never been online
    /// cannot crash.
    last_online: HashMap<String, bool>,
}

impl RenewalController {
    pub fn new(
        paths: FleetPaths,
        store: TemplateStore,
        aggregator: StatusAggregator,
        provisioner: Provisioner,
        process: Arc<dyn ProcessController>,
        registry: LivenessRegistry,
    ) -> Self {
        Self {
            paths,
            store,
            aggregator,
            provisioner,
            process,
            registry,
            last_online: HashMap::new(),
        }
    }

    /// One reconcile pass. Filesystem errors on the crash path abort the
    /// tick; the next tick starts from a fresh snapshot anyway.
    pub fn tick(&mut self) -> anyhow::Result<()> {
        let statuses = self.aggregator.list_statuses()?;

        let mut survivors = Vec::new();
        let mut crashed = Vec::new();
        for status in statuses {
            let was_online = self.last_online.get(&status.name).copied().unwrap_or(false);
            if was_online && !status.online {
                crashed.push(status);
            } else {
                survivors.push(status);
            }
        }

        for status in &crashed {
            warn!(instance = %status.name, "instance went offline, removing");
            self.process.stop(&status.name);
            self.registry.remove(&status.name);
            self.paths.delete_instance(&status.name)?;
        }

        self.last_online = survivors
            .iter()
            .map(|s| (s.name.clone(), s.online))
            .collect();

        // Prune to the names observed this tick. A registry-only pusher
        // with no backing directory stays while fresh; once stale it goes
        // offline and the crash path above removes it.
        let active: HashSet<String> = survivors.iter().map(|s| s.name.clone()).collect();
        self.registry.prune(&active);

        self.replace_crashed(&crashed)?;
        self.scale_up_pass(&survivors)?;
        Ok(())
    }

    /// Relaunch for templates a crash pushed below their minimum. The
    /// remaining count is recomputed from disk after each removal, so
    /// replacements launched earlier in the same tick are counted.
    fn replace_crashed(&self, crashed: &[ServerStatus]) -> anyhow::Result<()> {
        for status in crashed {
            let template = template_of(&status.name);
            if !self.paths.template_exists(&template) {
                warn!(instance = %status.name, %template, "no template for crashed instance");
                continue;
            }
            let spec = self.store.load(&template)?;
            let remaining = self
                .paths
                .list_instances()?
                .iter()
                .filter(|name| template_of(name) == template)
                .count() as i32;
            if remaining < spec.server_min.max(0) {
                let name = self.provisioner.start_template_server(&template)?;
                info!(instance = %name, %template, "replaced crashed instance");
            }
        }
        Ok(())
    }

    /// Add one instance to each template whose instances are all at player
    /// capacity. A non-positive `server_max` disables demand scaling for
    /// the template entirely.
    ///
    /// A template whose spec fails to load is skipped, not fatal — one bad
    /// template must not stall scaling for the rest.
    fn scale_up_pass(&self, survivors: &[ServerStatus]) -> anyhow::Result<()> {
        for template in self.paths.list_templates()? {
            let spec = match self.store.load(&template) {
                Ok(spec) => spec,
                Err(e) => {
                    warn!(%template, error = %e, "skipping template with unreadable spec");
                    continue;
                }
            };
            if spec.server_max <= 0 {
                continue;
            }

            let members: Vec<&ServerStatus> = survivors
                .iter()
                .filter(|s| template_of(&s.name) == template)
                .collect();
            if members.is_empty() {
                continue;
            }
            // An instance with no positive capacity can never be full, so
            // an offline member blocks scale-up until it recovers or the
            // crash path removes it.
            let all_full = members
                .iter()
                .all(|s| s.max_players > 0 && s.current_players >= s.max_players);
            if !all_full {
                continue;
            }
            if members.len() as i32 >= spec.server_max {
                continue;
            }

            let name = self.provisioner.start_template_server(&template)?;
            info!(instance = %name, %template, "scaled up saturated template");
        }
        Ok(())
    }

    /// Run the renewal loop until shutdown is signaled.
    pub async fn run(
        &mut self,
        interval: Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        info!(interval_ms = interval.as_millis() as u64, "renewal loop started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.tick() {
                        error!(error = %e, "renewal tick failed");
                    }
                }
                _ = shutdown.changed() => {
                    info!("renewal loop shutting down");
                    break;
                }
            }
        }
    }
}

/// Instance names are `<template>-<index>`; strip the last dash segment.
fn template_of(instance: &str) -> String {
    match instance.rfind('-') {
        Some(pos) if pos > 0 => instance[..pos].to_string(),
        _ => "unknown".to_string(),
    }
}
