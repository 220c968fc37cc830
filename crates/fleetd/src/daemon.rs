//! Daemon mode — the renewal loop plus the local HTTP API.

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::sync::watch;
use tracing::{info, warn};

use fleet_core::DaemonConfig;
use fleetgrid_api::ApiState;
use fleetgrid_renewal::RenewalController;

use crate::Orchestrator;

pub async fn run(root: PathBuf) -> anyhow::Result<()> {
    info!(root = %root.display(), "fleetgrid daemon starting");

    DaemonConfig::write_default_if_missing(&root.join("config.yml"))?;
    let config = DaemonConfig::load_from(&root.join("config.yml"));
    let orch = Orchestrator::new(root, config.base_port);
    orch.paths.ensure_root()?;
    orch.paths.ensure_tmp()?;

    // Sessions surviving a daemon restart are not adopted; the renewal
    // loop will treat their instances like any other cold directory.
    let leftovers = orch.process.list();
    if !leftovers.is_empty() {
        warn!(count = leftovers.len(), "found pre-existing worker sessions");
    }

    let mut renewal = RenewalController::new(
        orch.paths.clone(),
        orch.store.clone(),
        orch.aggregator.clone(),
        orch.provisioner.clone(),
        orch.process.clone(),
        orch.registry.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let renewal_shutdown = shutdown_rx.clone();
    let interval = config.renew_interval();
    info!(interval_ms = config.renew_interval_ms, "renewal loop starting");
    let renewal_handle = tokio::spawn(async move {
        renewal.run(interval, renewal_shutdown).await;
    });

    if config.http_api_enabled {
        let state = ApiState {
            aggregator: orch.aggregator.clone(),
            registry: orch.registry.clone(),
            decommissioner: orch.decommissioner.clone(),
        };
        let router = fleetgrid_api::build_router(state);
        // Loopback only: occupancy pushes are unauthenticated.
        let addr = SocketAddr::from(([127, 0, 0, 1], config.http_api_port));
        info!(%addr, "API server starting");
        let listener = tokio::net::TcpListener::bind(addr).await?;

        let server = axum::serve(listener, router).with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        });
        server.await?;
    } else {
        info!("HTTP API disabled");
        tokio::signal::ctrl_c().await?;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    }

    let _ = renewal_handle.await;
    info!("fleetgrid daemon stopped");
    Ok(())
}
