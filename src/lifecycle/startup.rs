//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn configured routes into backends, in order
//! - Register them with the pool before the listener accepts traffic
//!
//! # Design Decisions
//! - Fail fast: a route that cannot be parsed aborts startup

use thiserror::Error;

use crate::config::validation::check_route;
use crate::http::forward::Forwarder;
use crate::load_balancer::{BackendServer, ServerPool};

/// Startup failures. All of them are fatal.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid backend route {route:?}: {reason}")]
    InvalidRoute { route: String, reason: String },
}

/// Register one backend per route, sharing `forwarder` between them.
///
/// Returns the number of backends registered.
pub fn populate_pool(
    pool: &dyn ServerPool,
    routes: &[String],
    forwarder: &Forwarder,
) -> Result<usize, StartupError> {
    for route in routes {
        let url = check_route(route).map_err(|reason| StartupError::InvalidRoute {
            route: route.clone(),
            reason,
        })?;
        tracing::info!(host = %url.authority(), "Added backend server");
        pool.register(BackendServer::shared(url, forwarder.clone()));
    }
    Ok(routes.len())
}
