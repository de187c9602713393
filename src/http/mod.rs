//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeouts, tracing)
//!     → load balancer dispatch (pick backend)
//!     → forward.rs (rewrite URI, relay to upstream)
//!     → response.rs (strip hop-by-hop headers, error responses)
//!     → Send to client
//! ```

pub mod forward;
pub mod response;
pub mod server;

pub use forward::Forwarder;
pub use server::{HttpServer, ServerError};
