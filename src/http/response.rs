//! Response handling and transformation.
//!
//! # Responsibilities
//! - Uniform error responses for callers (503 when no backend, 502 on upstream failure)
//! - Strip hop-by-hop headers before relaying in either direction
//! - Maintain the X-Forwarded-For chain
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - Clients never see internal pool errors, only these fixed bodies

use std::net::IpAddr;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Header carrying the chain of client addresses.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Body of the response sent when the pool has no live backend.
pub const SERVICE_UNAVAILABLE_BODY: &str = "Service not available";

/// Body of the response sent when the chosen backend could not be reached.
pub const BAD_GATEWAY_BODY: &str = "Bad Gateway";

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// The single failure response clients see when no backend is alive.
pub fn service_unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, SERVICE_UNAVAILABLE_BODY).into_response()
}

/// Response for a transport failure towards the selected backend.
pub fn bad_gateway() -> Response {
    (StatusCode::BAD_GATEWAY, BAD_GATEWAY_BODY).into_response()
}

/// Remove connection-scoped headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<String> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(|token| token.trim().to_ascii_lowercase())
        .filter(|token| !token.is_empty())
        .collect();

    for name in &listed {
        headers.remove(name.as_str());
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Append `client` to the X-Forwarded-For chain.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{}, {}", prior, client),
        None => client.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
