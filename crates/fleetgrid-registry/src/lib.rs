//! fleetgrid-registry — concurrent store of push-reported occupancy.
//!
//! Instances report their player counts over the local API while the
//! renewal loop reads snapshots on its own schedule, so every operation
//! must be safe under concurrent callers. Update frequency is low (one
//! push per instance per reporting interval), so a single coarse lock
//! around one map is sufficient.
//!
//! An entry's counts are authoritative only while fresh: younger than the
//! freshness window (default 30s). Staleness never deletes an entry; it
//! only stops the entry from deciding online state.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

use fleet_core::PlayerCounts;
use tracing::debug;

const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct Entry {
    counts: PlayerCounts,
    display_name: Option<String>,
    first_seen_at: SystemTime,
    last_updated_at: SystemTime,
}

/// Thread-safe occupancy registry. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct LivenessRegistry {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    freshness_window: Duration,
}

impl Default for LivenessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessRegistry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
        }
    }

    /// Override the freshness window (tests use short windows).
    pub fn with_freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoning panic can only have interrupted a single upsert; the
        // map itself stays structurally sound.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Upsert for a newly launched instance: zero current players, clamped
    /// capacity. Sets `first_seen_at` if absent, always refreshes
    /// `last_updated_at`.
    pub fn register(&self, name: &str, max: i32) {
        let key = match clean_name(name) {
            Some(key) => key,
            None => return,
        };
        let now = SystemTime::now();
        let mut entries = self.lock();
        match entries.get_mut(&key) {
            Some(entry) => {
                entry.counts = PlayerCounts { current: 0, max: max.max(0) };
                entry.last_updated_at = now;
            }
            None => {
                debug!(name = %key, max = max.max(0), "instance registered");
                entries.insert(
                    key,
                    Entry {
                        counts: PlayerCounts { current: 0, max: max.max(0) },
                        display_name: None,
                        first_seen_at: now,
                        last_updated_at: now,
                    },
                );
            }
        }
    }

    /// Idempotent upsert of both counts, clamped to ≥ 0.
    pub fn set_counts(&self, name: &str, current: i32, max: i32) {
        self.set_counts_with_display(name, None, current, max);
    }

    /// Upsert with an optional display name alongside the counts.
    pub fn set_counts_with_display(
        &self,
        name: &str,
        display_name: Option<&str>,
        current: i32,
        max: i32,
    ) {
        let key = match clean_name(name) {
            Some(key) => key,
            None => return,
        };
        let now = SystemTime::now();
        let counts = PlayerCounts {
            current: current.max(0),
            max: max.max(0),
        };
        let display = display_name
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        let mut entries = self.lock();
        match entries.get_mut(&key) {
            Some(entry) => {
                entry.counts = counts;
                if display.is_some() {
                    entry.display_name = display;
                }
                entry.last_updated_at = now;
            }
            None => {
                entries.insert(
                    key,
                    Entry {
                        counts,
                        display_name: display,
                        first_seen_at: now,
                        last_updated_at: now,
                    },
                );
            }
        }
    }

    /// Update only the current count of an existing entry, preserving its
    /// max. Returns whether the entry existed.
    pub fn set_current_only(&self, name: &str, current: i32) -> bool {
        let key = match clean_name(name) {
            Some(key) => key,
            None => return false,
        };
        let mut entries = self.lock();
        match entries.get_mut(&key) {
            Some(entry) => {
                entry.counts.current = current.max(0);
                entry.last_updated_at = SystemTime::now();
                true
            }
            None => false,
        }
    }

    pub fn counts(&self, name: &str) -> Option<PlayerCounts> {
        self.lock().get(name).map(|e| e.counts)
    }

    pub fn remove(&self, name: &str) {
        self.lock().remove(name);
    }

    /// Retain only entries named in `active`. An empty set clears
    /// everything.
    pub fn prune(&self, active: &HashSet<String>) {
        let mut entries = self.lock();
        let before = entries.len();
        if active.is_empty() {
            entries.clear();
        } else {
            entries.retain(|name, _| active.contains(name));
        }
        if entries.len() != before {
            debug!(removed = before - entries.len(), "registry pruned");
        }
    }

    /// True iff the entry exists and was updated within the freshness
    /// window.
    pub fn is_fresh(&self, name: &str) -> bool {
        let entries = self.lock();
        let Some(entry) = entries.get(name) else {
            return false;
        };
        match SystemTime::now().duration_since(entry.last_updated_at) {
            Ok(age) => age <= self.freshness_window,
            // Timestamp in the future (clock adjustment): treat as fresh.
            Err(_) => true,
        }
    }

    pub fn names(&self) -> HashSet<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn started_at(&self, name: &str) -> Option<SystemTime> {
        self.lock().get(name).map(|e| e.first_seen_at)
    }

    pub fn last_updated_at(&self, name: &str) -> Option<SystemTime> {
        self.lock().get(name).map(|e| e.last_updated_at)
    }

    pub fn display_name(&self, name: &str) -> Option<String> {
        self.lock().get(name).and_then(|e| e.display_name.clone())
    }
}

fn clean_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
