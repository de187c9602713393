//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Snapshot the pool
//!     → Probe each backend in order (bounded by per-probe timeout)
//!     → Backend::set_alive(result)
//! ```
//!
//! # Design Decisions
//! - Liveness is a single flag per backend: one failed probe marks it dead,
//!   one successful probe revives it
//! - Failed probes are not retried within a round
//! - Probes are sequential to bound outbound concurrency

pub mod active;

pub use active::HealthChecker;
