//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream server by its base address
//! - Track liveness with an atomic flag (written by health checks, read by dispatch)
//! - Forward requests to the upstream

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::Body, http::Request, response::Response};
use url::Url;

use crate::http::forward::Forwarder;

/// Capabilities the pool, health checker and dispatcher need from a backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Proxy the request to this backend and return its response.
    async fn forward(&self, request: Request<Body>) -> Response;

    /// Base address; fixed for the lifetime of the backend.
    fn address(&self) -> &Url;

    fn set_alive(&self, alive: bool);

    fn is_alive(&self) -> bool;
}

/// Backends are shared between the pool, in-flight requests and health rounds.
pub type SharedBackend = Arc<dyn Backend>;

/// An upstream reached over HTTP.
pub struct BackendServer {
    url: Url,
    alive: AtomicBool,
    forwarder: Forwarder,
}

impl BackendServer {
    /// Create a backend. New backends are considered alive until probed.
    pub fn new(url: Url, forwarder: Forwarder) -> Self {
        Self {
            url,
            alive: AtomicBool::new(true),
            forwarder,
        }
    }

    /// Create a backend already wrapped for sharing.
    pub fn shared(url: Url, forwarder: Forwarder) -> SharedBackend {
        Arc::new(Self::new(url, forwarder))
    }
}

impl fmt::Debug for BackendServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendServer")
            .field("url", &self.url.as_str())
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[async_trait]
impl Backend for BackendServer {
    async fn forward(&self, request: Request<Body>) -> Response {
        self.forwarder.forward(&self.url, request).await
    }

    fn address(&self) -> &Url {
        &self.url
    }

    fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Relaxed);
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }
}
