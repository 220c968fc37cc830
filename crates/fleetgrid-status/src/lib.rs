//! fleetgrid-status — one merged view of every instance.
//!
//! An instance can be known from two places: its directory on disk and its
//! entry in the liveness registry. The aggregator unions both, then decides
//! per instance whether it is online. Fresh registry data is authoritative;
//! without it, a short TCP connect to the instance's declared port decides.

use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::debug;

use fleet_core::ServerStatus;
use fleetgrid_registry::LivenessRegistry;
use fleetgrid_workspace::{properties, FleetPaths, TemplateStore, WorkspaceError};

/// Connect timeout for the liveness probe. Local connects either succeed
/// immediately or not at all, so this stays short.
const PROBE_TIMEOUT: Duration = Duration::from_millis(200);

pub type StatusResult<T> = Result<T, StatusError>;

#[derive(Debug, Error)]
pub enum StatusError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
}

/// Builds status snapshots from the disk inventory and the registry.
#[derive(Clone)]
pub struct StatusAggregator {
    paths: FleetPaths,
    store: TemplateStore,
    registry: LivenessRegistry,
}

impl StatusAggregator {
    pub fn new(paths: FleetPaths, store: TemplateStore, registry: LivenessRegistry) -> Self {
        Self {
            paths,
            store,
            registry,
        }
    }

    /// Snapshot every known instance, sorted by name.
    pub fn list_statuses(&self) -> StatusResult<Vec<ServerStatus>> {
        let mut names: Vec<String> = self.paths.list_instances()?;
        for name in self.registry.names() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.sort();

        names.iter().map(|name| self.status_of(name)).collect()
    }

    /// Snapshot a single instance, or `None` when neither the disk nor the
    /// registry knows it.
    pub fn status(&self, name: &str) -> StatusResult<Option<ServerStatus>> {
        if !self.paths.instance_exists(name) && self.registry.counts(name).is_none() {
            return Ok(None);
        }
        self.status_of(name).map(Some)
    }

    fn status_of(&self, name: &str) -> StatusResult<ServerStatus> {
        let identity = self.store.load_instance_identity(name);
        let template = identity
            .as_ref()
            .and_then(|spec| spec.explicit_name().map(str::to_string))
            .unwrap_or_else(|| derive_template_name(name));
        let port = properties::read_declared_port(&self.paths.instance_dir(name));

        let fresh = self.registry.is_fresh(name);
        let online = fresh || port.is_some_and(probe);

        let (current_players, max_players) = if fresh {
            // Fresh registry counts win over anything inferred from disk.
            let counts = self.registry.counts(name).unwrap_or_default();
            (counts.current, counts.max)
        } else {
            let max = identity.map(|spec| spec.max_players.max(0)).unwrap_or(0);
            (0, max)
        };

        let started_at = self
            .registry
            .started_at(name)
            .and_then(|t| epoch_ms(t));

        Ok(ServerStatus {
            name: name.to_string(),
            template,
            port,
            online,
            current_players,
            max_players,
            started_at,
        })
    }
}

/// Instance names are `<template>-<index>`; strip the last dash segment.
fn derive_template_name(instance: &str) -> String {
    match instance.rfind('-') {
        Some(pos) if pos > 0 => instance[..pos].to_string(),
        _ => "unknown".to_string(),
    }
}

fn probe(port: u16) -> bool {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let reachable = TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok();
    debug!(port, reachable, "probed instance port");
    reachable
}

fn epoch_ms(t: SystemTime) -> Option<u64> {
    t.duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::net::TcpListener;

    use fleet_core::TemplateSpec;

    fn fixture() -> (tempfile::TempDir, FleetPaths, TemplateStore, LivenessRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let paths = FleetPaths::new(dir.path());
        let store = TemplateStore::new(paths.clone());
        let registry = LivenessRegistry::new();
        (dir, paths, store, registry)
    }

    fn aggregator(
        paths: &FleetPaths,
        store: &TemplateStore,
        registry: &LivenessRegistry,
    ) -> StatusAggregator {
        StatusAggregator::new(paths.clone(), store.clone(), registry.clone())
    }

    fn add_instance(paths: &FleetPaths, name: &str) {
        fs::create_dir_all(paths.instance_dir(name)).unwrap();
    }

    fn write_identity(paths: &FleetPaths, instance: &str, spec: &TemplateSpec) {
        let content = format!(
            "templateName: {}\nmaxRamMb: {}\nmaxPlayers: {}\nserverMin: {}\nserverMax: {}\n",
            spec.name.as_deref().unwrap_or(""),
            spec.max_ram_mb,
            spec.max_players,
            spec.server_min,
            spec.server_max,
        );
        fs::write(paths.instance_dir(instance).join("template.yml"), content).unwrap();
    }

    #[test]
    fn empty_system_yields_no_statuses() {
        let (_dir, paths, store, registry) = fixture();
        let statuses = aggregator(&paths, &store, &registry).list_statuses().unwrap();
        assert!(statuses.is_empty());
    }

    #[test]
    fn offline_instance_without_port_or_registry() {
        let (_dir, paths, store, registry) = fixture();
        add_instance(&paths, "lobby-1");

        let statuses = aggregator(&paths, &store, &registry).list_statuses().unwrap();
        assert_eq!(statuses.len(), 1);
        let status = &statuses[0];
        assert_eq!(status.name, "lobby-1");
        assert_eq!(status.template, "lobby");
        assert_eq!(status.port, None);
        assert!(!status.online);
        assert_eq!(status.current_players, 0);
        assert_eq!(status.max_players, 0);
        assert_eq!(status.started_at, None);
    }

    #[test]
    fn fresh_registry_entry_is_authoritative() {
        let (_dir, paths, store, registry) = fixture();
        add_instance(&paths, "lobby-1");
        registry.set_counts("lobby-1", 7, 20);

        let status = aggregator(&paths, &store, &registry)
            .status("lobby-1")
            .unwrap()
            .unwrap();
        assert!(status.online);
        assert_eq!(status.current_players, 7);
        assert_eq!(status.max_players, 20);
        assert!(status.started_at.is_some());
    }

    #[test]
    fn stale_entry_falls_back_to_identity_and_probe() {
        let (_dir, paths, store, registry) = fixture();
        let registry = registry.with_freshness_window(Duration::ZERO);
        add_instance(&paths, "lobby-1");
        write_identity(
            &paths,
            "lobby-1",
            &TemplateSpec {
                name: Some("lobby".to_string()),
                max_ram_mb: 512,
                max_players: 20,
                server_min: 1,
                server_max: 2,
            },
        );
        registry.set_counts("lobby-1", 7, 20);
        std::thread::sleep(Duration::from_millis(20));

        let status = aggregator(&paths, &store, &registry)
            .status("lobby-1")
            .unwrap()
            .unwrap();
        // No declared port, nothing to probe.
        assert!(!status.online);
        assert_eq!(status.current_players, 0);
        assert_eq!(status.max_players, 20);
    }

    #[test]
    fn probe_detects_a_listening_port() {
        let (_dir, paths, store, registry) = fixture();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        add_instance(&paths, "lobby-1");
        fs::write(
            paths.instance_dir("lobby-1").join("server.properties"),
            format!("server-port={port}\n"),
        )
        .unwrap();

        let status = aggregator(&paths, &store, &registry)
            .status("lobby-1")
            .unwrap()
            .unwrap();
        assert_eq!(status.port, Some(port));
        assert!(status.online);
        drop(listener);
    }

    #[test]
    fn registry_only_instance_is_included() {
        let (_dir, paths, store, registry) = fixture();
        registry.set_counts("lobby-1", 3, 20);

        let statuses = aggregator(&paths, &store, &registry).list_statuses().unwrap();
        assert_eq!(statuses.len(), 1);
        assert!(statuses[0].online);
        assert_eq!(statuses[0].current_players, 3);
    }

    #[test]
    fn template_name_prefers_explicit_identity() {
        let (_dir, paths, store, registry) = fixture();
        add_instance(&paths, "lobby-1");
        write_identity(
            &paths,
            "lobby-1",
            &TemplateSpec {
                name: Some("main-lobby".to_string()),
                max_ram_mb: 512,
                max_players: 20,
                server_min: 1,
                server_max: 2,
            },
        );

        let status = aggregator(&paths, &store, &registry)
            .status("lobby-1")
            .unwrap()
            .unwrap();
        assert_eq!(status.template, "main-lobby");
    }

    #[test]
    fn dashless_name_has_unknown_template() {
        let (_dir, paths, store, registry) = fixture();
        add_instance(&paths, "solo");

        let status = aggregator(&paths, &store, &registry)
            .status("solo")
            .unwrap()
            .unwrap();
        assert_eq!(status.template, "unknown");
    }

    #[test]
    fn unknown_instance_is_none() {
        let (_dir, paths, store, registry) = fixture();
        assert!(aggregator(&paths, &store, &registry)
            .status("ghost")
            .unwrap()
            .is_none());
    }
}
