//! Core domain types shared across the fleetgrid crates.

use serde::{Deserialize, Serialize};

/// Declarative spec for a server template, stored as `template.yml` inside
/// the template directory.
///
/// The spec is immutable once loaded and re-read from disk on every use —
/// there is no caching layer that could go stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    /// Optional explicit name. When absent, the name is inferred from the
    /// directory the spec was loaded from.
    pub name: Option<String>,
    /// Fixed heap size for the worker process, in megabytes. Must be
    /// positive at provisioning time.
    pub max_ram_mb: i32,
    /// Declared player capacity per instance.
    pub max_players: i32,
    /// Minimum number of instances to keep running. Negative values are
    /// clamped to zero at use.
    pub server_min: i32,
    /// Scale-up cap. Zero disables demand scaling for the template.
    pub server_max: i32,
}

impl TemplateSpec {
    /// Returns the explicit name if set and non-empty.
    pub fn explicit_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Push-reported occupancy for one instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerCounts {
    pub current: i32,
    pub max: i32,
}

/// Point-in-time view of one instance, merged from the on-disk inventory,
/// the liveness registry, and a direct TCP probe.
///
/// Recomputed on every call, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Instance id (`<template>-<index>`).
    pub name: String,
    /// Owning template, from the instance's inherited spec or derived from
    /// the name prefix.
    pub template: String,
    /// Declared listen port, if the instance's network config declares one.
    pub port: Option<u16>,
    pub online: bool,
    pub current_players: i32,
    pub max_players: i32,
    /// When the registry first saw this instance, epoch milliseconds.
    pub started_at: Option<u64>,
}
