//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → dispatch.rs (LoadBalancer::serve)
//!     → pool.rs contract, round_robin.rs strategy (next live backend)
//!     → backend.rs (forward to upstream)
//!     → upstream response, or 503 if no backend is live
//! ```
//!
//! # Design Decisions
//! - The dispatcher holds nothing but a pool reference
//! - Pool strategies sit behind the `ServerPool` trait
//! - Dead backends are skipped, never removed, by selection
//! - No retry or rerouting after a backend has been chosen

pub mod backend;
pub mod dispatch;
pub mod pool;
pub mod round_robin;

pub use backend::{Backend, BackendServer, SharedBackend};
pub use dispatch::LoadBalancer;
pub use pool::{new_server_pool, ServerPool};
pub use round_robin::RoundRobinPool;
