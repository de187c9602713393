//! Backend pool contract.
//!
//! # Responsibilities
//! - Define what dispatch and health checking require from a pool
//! - Construct the default (round-robin) pool
//!
//! Alternative selection strategies implement [`ServerPool`] and plug into
//! [`LoadBalancer`](crate::load_balancer::LoadBalancer) and
//! [`HealthChecker`](crate::health::HealthChecker) unchanged.

use std::sync::Arc;

use crate::load_balancer::backend::SharedBackend;
use crate::load_balancer::round_robin::RoundRobinPool;

/// A concurrently shared, mutable collection of backends.
pub trait ServerPool: Send + Sync {
    /// Append a backend. Duplicates are not rejected.
    fn register(&self, backend: SharedBackend);

    /// Remove the first entry that is the same backend; no-op if absent.
    fn remove(&self, backend: &SharedBackend);

    /// Current number of backends.
    fn size(&self) -> usize;

    /// Snapshot of the backends, unaffected by later mutation.
    fn list_all(&self) -> Vec<SharedBackend>;

    /// Next live backend according to the pool's strategy, or `None`.
    fn next_available(&self) -> Option<SharedBackend>;
}

/// Create the default pool.
pub fn new_server_pool() -> Arc<dyn ServerPool> {
    Arc::new(RoundRobinPool::new())
}
