//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the backend pool from configured routes
//! - Create Axum Router with the dispatch handler for every method and path
//! - Wire up middleware (tracing, read/write timeouts)
//! - Run the health checker alongside the listener
//! - Drain in-flight requests on shutdown, bounded by a grace period

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use hyper::{body::Incoming, server::conn::http1};
use hyper_util::{rt::TokioIo, service::TowerToHyperService};
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio::time;
use tower::ServiceExt;
use tower_http::{
    timeout::{RequestBodyTimeoutLayer, TimeoutLayer},
    trace::TraceLayer,
};

use crate::config::validation::validate_config;
use crate::config::{BalancerConfig, ConfigError};
use crate::health::HealthChecker;
use crate::http::forward::Forwarder;
use crate::lifecycle::{populate_pool, ShutdownSignal, StartupError};
use crate::load_balancer::{new_server_pool, LoadBalancer, ServerPool};

const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("startup failed: {0}")]
    Startup(#[from] StartupError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP front end of the load balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    pool: Arc<dyn ServerPool>,
    forwarder: Forwarder,
}

impl HttpServer {
    /// Build the pool, dispatcher and router from the given configuration.
    ///
    /// The configuration is validated here as well, so configs built in code
    /// get the same checks as loaded ones.
    pub fn new(config: BalancerConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let forwarder = Forwarder::new();
        let pool = new_server_pool();
        populate_pool(pool.as_ref(), &config.backend.routes, &forwarder)?;

        let balancer = LoadBalancer::new(pool.clone());
        let router = Self::build_router(&config, balancer);

        Ok(Self {
            router,
            config,
            pool,
            forwarder,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BalancerConfig, balancer: LoadBalancer) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch_handler))
            .route("/", any(dispatch_handler))
            .with_state(balancer)
            .layer(RequestBodyTimeoutLayer::new(config.server.read_timeout()))
            .layer(TimeoutLayer::new(config.server.write_timeout()))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    ///
    /// After the signal no new connections are accepted and open connections
    /// close once their in-flight request completes. Connections still busy
    /// after `shutdown_grace_secs` are aborted.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.size(),
            "Load balancer listening"
        );

        let health = if self.config.backend.health_check.enabled {
            let checker = HealthChecker::new(
                self.pool.clone(),
                &self.config.backend.health_check,
                self.forwarder.client().clone(),
            );
            Some(tokio::spawn(checker.run(shutdown.clone())))
        } else {
            None
        };

        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote)) => {
                        connections.spawn(serve_connection(
                            self.router.clone(),
                            stream,
                            remote,
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }
        drop(listener);

        let grace = self.config.server.shutdown_grace();
        tracing::info!(
            grace_secs = grace.as_secs(),
            connections = connections.len(),
            "Draining in-flight requests"
        );
        let drained = time::timeout(grace, async {
            while connections.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                grace_secs = grace.as_secs(),
                remaining = connections.len(),
                "Grace period expired, closing remaining connections"
            );
            connections.shutdown().await;
        }

        if let Some(handle) = health {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Health checker task failed");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The pool backing this server.
    pub fn pool(&self) -> &Arc<dyn ServerPool> {
        &self.pool
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }
}

/// Serve one client connection until it closes or shutdown drains it.
async fn serve_connection(
    router: Router,
    stream: TcpStream,
    remote: SocketAddr,
    mut shutdown: ShutdownSignal,
) {
    let service = router.map_request(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(remote));
        request
    });
    let connection = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), TowerToHyperService::new(service));
    tokio::pin!(connection);

    let result = tokio::select! {
        result = connection.as_mut() => result,
        _ = shutdown.recv() => {
            connection.as_mut().graceful_shutdown();
            connection.await
        }
    };
    if let Err(e) = result {
        tracing::debug!(client = %remote, error = %e, "Connection closed with error");
    }
}

/// Every inbound request goes through the load balancer.
async fn dispatch_handler(
    State(balancer): State<LoadBalancer>,
    request: Request<Body>,
) -> Response {
    balancer.serve(request).await
}
