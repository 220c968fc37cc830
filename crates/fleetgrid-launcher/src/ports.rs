//! Free-port discovery.
//!
//! A candidate port is free when it is not in the caller's exclusion set
//! and an exclusive local bind succeeds. The bind is released immediately,
//! so the check is not atomic with the worker's own bind — an unrelated
//! process can theoretically grab the port in between. The exclusion set
//! is what prevents double-assignment within a single provisioning call.

use std::collections::HashSet;
use std::net::TcpListener;

use crate::error::{LaunchError, LaunchResult};

/// Scan sequentially from `start` (at least 1) through 65535 and return
/// the first free candidate.
pub fn find_free_port(start: u16, excluded: &HashSet<u16>) -> LaunchResult<u16> {
    for port in start.max(1)..=u16::MAX {
        if !excluded.contains(&port) && is_port_free(port) {
            return Ok(port);
        }
    }
    Err(LaunchError::PortsExhausted)
}

fn is_port_free(port: u16) -> bool {
    TcpListener::bind(("0.0.0.0", port)).is_ok()
}
