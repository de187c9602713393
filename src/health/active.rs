//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every backend in the pool
//! - Flip each backend's liveness flag from the probe result
//!
//! A round walks a snapshot of the pool in order, one probe at a time. Each
//! probe is bounded by its own timeout; the shutdown signal abandons the rest
//! of the round, leaving the in-flight backend at its previous value.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use tokio::time::{self, MissedTickBehavior};
use url::Url;

use crate::config::HealthCheckConfig;
use crate::http::forward::upstream_uri;
use crate::lifecycle::ShutdownSignal;
use crate::load_balancer::ServerPool;
use crate::observability::metrics;

const USER_AGENT: &str = "rr-balancer-health-check";

pub struct HealthChecker {
    pool: Arc<dyn ServerPool>,
    client: Client<HttpConnector, Body>,
    enabled: bool,
    path: String,
    timeout: Duration,
    interval: Duration,
}

impl HealthChecker {
    pub fn new(
        pool: Arc<dyn ServerPool>,
        config: &HealthCheckConfig,
        client: Client<HttpConnector, Body>,
    ) -> Self {
        Self {
            pool,
            client,
            enabled: config.enabled,
            path: config.path.clone(),
            timeout: config.timeout(),
            interval: config.interval(),
        }
    }

    /// Probe the pool every interval until shutdown.
    ///
    /// The first round starts immediately. Rounds never overlap; ticks missed
    /// while a slow round runs are skipped.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        if !self.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.timeout.as_secs(),
            path = %self.path,
            "Health checker starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Health checker received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.probe_all(&mut shutdown).await;
                }
            }
        }
    }

    /// Run one round over the current pool snapshot.
    ///
    /// Returns how many backends had their liveness updated, which is less
    /// than the snapshot size only when shutdown interrupted the round.
    pub async fn probe_all(&self, shutdown: &mut ShutdownSignal) -> usize {
        let backends = self.pool.list_all();
        let total = backends.len();
        let mut updated = 0;

        for backend in backends {
            let alive = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!(
                        remaining = total - updated,
                        "Health check round abandoned on shutdown"
                    );
                    return updated;
                }
                alive = self.probe(backend.address()) => alive,
            };

            let was_alive = backend.is_alive();
            backend.set_alive(alive);
            updated += 1;

            let host = backend.address().as_str();
            if was_alive != alive {
                tracing::info!(host = %host, alive, "Backend liveness changed");
            } else {
                tracing::debug!(host = %host, alive, "Backend status");
            }
            metrics::record_backend_health(host, alive);
        }

        updated
    }

    /// Probe a single backend. Alive iff it answers 2xx within the timeout.
    pub async fn probe(&self, base: &Url) -> bool {
        let uri = match self.path.parse::<Uri>().and_then(|path| upstream_uri(base, &path)) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(backend = %base, path = %self.path, error = %e, "Invalid health check URI");
                return false;
            }
        };

        let request = match Request::builder()
            .method(Method::GET)
            .uri(uri.clone())
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(uri = %uri, error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(uri = %uri, status = %response.status(), "Health check failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(uri = %uri, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(uri = %uri, timeout = ?self.timeout, "Health check failed: timeout");
                false
            }
        }
    }
}
