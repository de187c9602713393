//! Request dispatch.
//!
//! Picks the next live backend from the pool and hands the request to it.
//! When the pool has nothing to offer the caller gets a uniform 503 and no
//! backend is contacted.

use std::sync::Arc;
use std::time::Instant;

use axum::{body::Body, http::Request, response::Response};

use crate::http::response::service_unavailable;
use crate::load_balancer::pool::ServerPool;
use crate::observability::metrics;

/// Dispatch facade over a [`ServerPool`].
#[derive(Clone)]
pub struct LoadBalancer {
    pool: Arc<dyn ServerPool>,
}

impl LoadBalancer {
    pub fn new(pool: Arc<dyn ServerPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<dyn ServerPool> {
        &self.pool
    }

    /// Forward `request` to the next live backend, or answer 503.
    pub async fn serve(&self, request: Request<Body>) -> Response {
        let start = Instant::now();
        let method = request.method().to_string();

        let Some(backend) = self.pool.next_available() else {
            tracing::warn!(
                method = %method,
                path = %request.uri().path(),
                pool_size = self.pool.size(),
                "No live backend available"
            );
            metrics::record_no_backend();
            metrics::record_request(&method, 503, "none", start);
            return service_unavailable();
        };

        tracing::debug!(
            backend = %backend.address(),
            method = %method,
            path = %request.uri().path(),
            "Dispatching request"
        );

        let response = backend.forward(request).await;
        metrics::record_request(
            &method,
            response.status().as_u16(),
            backend.address().as_str(),
            start,
        );
        response
    }
}
