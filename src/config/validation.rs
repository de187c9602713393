//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, port valid)
//! - Check every backend route is a usable upstream URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: BalancerConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Duplicate routes are accepted

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::BalancerConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("port must be between 1 and 65535")]
    InvalidPort,

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("health check path {0:?} must start with '/'")]
    InvalidHealthPath(String),

    #[error("backend route {route:?} is invalid: {reason}")]
    InvalidRoute { route: String, reason: String },

    #[error("metrics address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    let durations = [
        ("server.read_timeout_secs", config.server.read_timeout_secs),
        ("server.write_timeout_secs", config.server.write_timeout_secs),
        ("backend.health_check.timeout_secs", config.backend.health_check.timeout_secs),
        ("backend.health_check.interval_secs", config.backend.health_check.interval_secs),
    ];
    for (field, value) in durations {
        if value == 0 {
            errors.push(ValidationError::ZeroDuration { field });
        }
    }

    if !config.backend.health_check.path.starts_with('/') {
        errors.push(ValidationError::InvalidHealthPath(
            config.backend.health_check.path.clone(),
        ));
    }

    for route in &config.backend.routes {
        if let Err(reason) = check_route(route) {
            errors.push(ValidationError::InvalidRoute {
                route: route.clone(),
                reason,
            });
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse a route the same way startup does and report why it is unusable.
pub fn check_route(route: &str) -> Result<Url, String> {
    let url = Url::parse(route).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err("query and fragment are not allowed".to_string());
    }
    Ok(url)
}
