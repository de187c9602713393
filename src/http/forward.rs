//! Upstream forwarding.
//!
//! # Responsibilities
//! - Rewrite an inbound request so it targets one backend
//! - Relay request and response bodies without buffering
//! - Turn transport errors into a 502 for the caller
//!
//! # Design Decisions
//! - One shared hyper-util client; its connection handling is left at defaults
//! - No retries: a failed forward is answered, not rerouted

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{uri::InvalidUri, Request, Uri, Version},
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use url::Url;

use crate::http::response::{append_forwarded_for, bad_gateway, strip_hop_by_hop};

/// Forwards requests to an upstream base URL over a shared HTTP client.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
}

impl Forwarder {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }

    /// The underlying client, shared with the health checker.
    pub fn client(&self) -> &Client<HttpConnector, Body> {
        &self.client
    }

    /// Proxy `request` to `base` and return the upstream's response.
    ///
    /// Transport failures are logged and answered with `502 Bad Gateway`.
    pub async fn forward(&self, base: &Url, request: Request<Body>) -> Response {
        let (mut parts, body) = request.into_parts();

        let uri = match upstream_uri(base, &parts.uri) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(backend = %base, uri = %parts.uri, error = %e, "Failed to build upstream URI");
                return bad_gateway();
            }
        };

        let client_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        strip_hop_by_hop(&mut parts.headers);
        if let Some(ip) = client_ip {
            append_forwarded_for(&mut parts.headers, ip);
        }
        parts.uri = uri;
        parts.version = Version::HTTP_11;

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                let (mut parts, body) = response.into_parts();
                strip_hop_by_hop(&mut parts.headers);
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(backend = %base, error = %e, "Upstream request failed");
                bad_gateway()
            }
        }
    }
}

impl Default for Forwarder {
    fn default() -> Self {
        Self::new()
    }
}

/// Join the backend base URL with the inbound path and query.
pub fn upstream_uri(base: &Url, inbound: &Uri) -> Result<Uri, InvalidUri> {
    let host = base.host_str().unwrap_or_default();
    let authority = match base.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let base_path = base.path().trim_end_matches('/');
    let path_and_query = inbound.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    format!("{}://{}{}{}", base.scheme(), authority, base_path, path_and_query).parse()
}
