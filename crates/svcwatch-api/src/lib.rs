//! svcwatch-api: read-mostly REST surface over the health monitor.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/services` | List services with their last status |
//! | GET | `/api/v1/services/{name}` | Get one service |
//! | POST | `/api/v1/services/{name}/check` | Run an on-demand check |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;
pub mod prometheus;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use svcwatch_health::HealthMonitor;

pub use handlers::ServiceView;
pub use prometheus::render_prometheus;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub monitor: Arc<HealthMonitor>,
}

/// Build the complete API router (REST + metrics).
pub fn build_router(monitor: Arc<HealthMonitor>) -> Router {
    let api_state = ApiState { monitor };

    let api_routes = Router::new()
        .route("/services", get(handlers::list_services))
        .route("/services/{name}", get(handlers::get_service))
        .route("/services/{name}/check", post(handlers::check_service))
        .with_state(api_state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics).with_state(api_state))
}
