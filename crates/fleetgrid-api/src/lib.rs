//! fleetgrid-api — local HTTP API for the daemon.
//!
//! Instances push their occupancy here and operators read fleet state.
//! The API binds to loopback only; there is no authentication layer.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/health` | Daemon liveness |
//! | GET | `/api/servers` | Status of every instance |
//! | GET | `/api/servers/{name}` | Status of one instance |
//! | POST | `/api/servers/{name}/stop` | Decommission one instance |
//! | POST | `/api/servers/{name}/players` | Push the current player count |
//! | POST | `/api/servers/{name}/counts` | Push full occupancy |

pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use fleetgrid_launcher::Decommissioner;
use fleetgrid_registry::LivenessRegistry;
use fleetgrid_status::StatusAggregator;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub aggregator: StatusAggregator,
    pub registry: LivenessRegistry,
    pub decommissioner: Decommissioner,
}

/// Build the complete API router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/servers", get(handlers::list_servers))
        .route("/servers/{name}", get(handlers::get_server))
        .route("/servers/{name}/stop", post(handlers::stop_server))
        .route("/servers/{name}/players", post(handlers::push_players))
        .route("/servers/{name}/counts", post(handlers::push_counts))
        .with_state(state);

    Router::new().nest("/api", api_routes)
}
