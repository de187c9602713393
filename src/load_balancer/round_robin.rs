//! Round-robin backend pool.
//!
//! Backends are kept in registration order behind a readers-writer lock
//! together with the rotation cursor. Rotation reads and advances the cursor,
//! so it takes the write lock like `register` and `remove`.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::load_balancer::backend::SharedBackend;
use crate::load_balancer::pool::ServerPool;

#[derive(Default)]
struct PoolState {
    backends: Vec<SharedBackend>,
    /// Index of the last backend handed out. Always `< backends.len()` when non-empty.
    current: usize,
}

/// Pool that hands out live backends in rotation.
#[derive(Default)]
pub struct RoundRobinPool {
    state: RwLock<PoolState>,
}

impl RoundRobinPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool pre-populated in the given order.
    pub fn with_backends(backends: impl IntoIterator<Item = SharedBackend>) -> Self {
        let pool = Self::new();
        for backend in backends {
            pool.register(backend);
        }
        pool
    }

    /// Advance the cursor one position and return the backend it now points at.
    ///
    /// Returns `None` for an empty pool.
    pub fn rotate(&self) -> Option<SharedBackend> {
        let mut state = self.state.write();
        let len = state.backends.len();
        if len == 0 {
            return None;
        }
        state.current = (state.current + 1) % len;
        Some(state.backends[state.current].clone())
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.state.read().current
    }
}

fn same_backend(a: &SharedBackend, b: &SharedBackend) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl ServerPool for RoundRobinPool {
    fn register(&self, backend: SharedBackend) {
        self.state.write().backends.push(backend);
    }

    fn remove(&self, backend: &SharedBackend) {
        let mut state = self.state.write();
        let Some(index) = state.backends.iter().position(|b| same_backend(b, backend)) else {
            return;
        };
        state.backends.remove(index);

        // Keep the cursor on the predecessor of whatever followed the removed entry.
        let len = state.backends.len();
        if len == 0 {
            state.current = 0;
        } else if index <= state.current {
            state.current = if state.current == 0 { len - 1 } else { state.current - 1 };
        }
    }

    fn size(&self) -> usize {
        self.state.read().backends.len()
    }

    fn list_all(&self) -> Vec<SharedBackend> {
        self.state.read().backends.clone()
    }

    fn next_available(&self) -> Option<SharedBackend> {
        for _ in 0..self.size() {
            let backend = self.rotate()?;
            if backend.is_alive() {
                return Some(backend);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::backend::Backend;
    use async_trait::async_trait;
    use axum::{body::Body, http::Request, response::{IntoResponse, Response}};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use url::Url;

    struct MockBackend {
        url: Url,
        alive: AtomicBool,
        liveness_reads: AtomicUsize,
    }

    impl MockBackend {
        fn shared(port: u16, alive: bool) -> Arc<Self> {
            Arc::new(Self {
                url: Url::parse(&format!("http://127.0.0.1:{}", port)).unwrap(),
                alive: AtomicBool::new(alive),
                liveness_reads: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Backend for MockBackend {
        async fn forward(&self, _request: Request<Body>) -> Response {
            self.url.to_string().into_response()
        }

        fn address(&self) -> &Url {
            &self.url
        }

        fn set_alive(&self, alive: bool) {
            self.alive.store(alive, Ordering::SeqCst);
        }

        fn is_alive(&self) -> bool {
            self.liveness_reads.fetch_add(1, Ordering::SeqCst);
            self.alive.load(Ordering::SeqCst)
        }
    }

    fn port_of(backend: &SharedBackend) -> u16 {
        backend.address().port().unwrap()
    }

    #[test]
    fn test_new_pool_is_empty() {
        let pool = RoundRobinPool::new();
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.cursor(), 0);
        assert!(pool.list_all().is_empty());
    }

    #[test]
    fn test_empty_pool_has_no_backend() {
        let pool = RoundRobinPool::new();
        assert!(pool.rotate().is_none());
        assert!(pool.next_available().is_none());
    }

    #[test]
    fn test_round_robin_visits_each_once() {
        let pool = RoundRobinPool::with_backends(
            (8080..8084).map(|p| MockBackend::shared(p, true) as SharedBackend),
        );

        let first_cycle: Vec<u16> = (0..4)
            .map(|_| port_of(&pool.next_available().unwrap()))
            .collect();
        let mut sorted = first_cycle.clone();
        sorted.sort();
        assert_eq!(sorted, vec![8080, 8081, 8082, 8083]);

        // The next call repeats the first pick.
        assert_eq!(port_of(&pool.next_available().unwrap()), first_cycle[0]);
    }

    #[test]
    fn test_skips_dead_backends() {
        let a = MockBackend::shared(8080, false);
        let b = MockBackend::shared(8081, true);
        let c = MockBackend::shared(8082, true);
        let pool = RoundRobinPool::with_backends([
            a.clone() as SharedBackend,
            b.clone() as SharedBackend,
            c.clone() as SharedBackend,
        ]);

        // Cursor starts at A.
        assert_eq!(port_of(&pool.next_available().unwrap()), 8081);

        b.set_alive(false);
        assert_eq!(port_of(&pool.next_available().unwrap()), 8082);

        a.set_alive(false);
        c.set_alive(false);
        assert!(pool.next_available().is_none());
    }

    #[test]
    fn test_search_bounded_to_one_cycle() {
        let backends: Vec<_> = (8080..8085).map(|p| MockBackend::shared(p, false)).collect();
        let pool = RoundRobinPool::with_backends(backends.iter().map(|b| b.clone() as SharedBackend));
        let before = pool.cursor();

        assert!(pool.next_available().is_none());

        // One liveness read per backend, and the cursor is back where it started.
        for b in &backends {
            assert_eq!(b.liveness_reads.load(Ordering::SeqCst), 1);
        }
        assert_eq!(pool.cursor(), before);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let a: SharedBackend = MockBackend::shared(8080, true);
        let pool = RoundRobinPool::new();
        pool.register(a.clone());
        pool.register(a.clone());
        assert_eq!(pool.size(), 2);

        pool.remove(&a);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_remove_by_identity() {
        let a: SharedBackend = MockBackend::shared(8080, true);
        let b: SharedBackend = MockBackend::shared(8081, true);
        let lookalike: SharedBackend = MockBackend::shared(8080, true);
        let pool = RoundRobinPool::with_backends([a.clone(), b.clone()]);

        pool.remove(&lookalike);
        assert_eq!(pool.size(), 2);

        pool.remove(&a);
        let remaining = pool.list_all();
        assert_eq!(remaining.len(), 1);
        assert!(same_backend(&remaining[0], &b));

        pool.remove(&b);
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.cursor(), 0);
        assert!(pool.next_available().is_none());
    }

    #[test]
    fn test_remove_continues_rotation() {
        let backends: Vec<SharedBackend> = (8080..8083)
            .map(|p| MockBackend::shared(p, true) as SharedBackend)
            .collect();
        let pool = RoundRobinPool::with_backends(backends.clone());

        assert_eq!(port_of(&pool.next_available().unwrap()), 8081);
        pool.remove(&backends[1]);
        assert_eq!(port_of(&pool.next_available().unwrap()), 8082);
        assert_eq!(port_of(&pool.next_available().unwrap()), 8080);

        // Removing the entry under a cursor at 0 wraps to the tail.
        let pool = RoundRobinPool::with_backends(backends.clone());
        pool.remove(&backends[0]);
        assert!(pool.cursor() < pool.size());
        assert_eq!(port_of(&pool.next_available().unwrap()), 8081);
    }

    #[test]
    fn test_list_all_is_a_snapshot() {
        let pool = RoundRobinPool::with_backends([MockBackend::shared(8080, true) as SharedBackend]);
        let snapshot = pool.list_all();
        pool.register(MockBackend::shared(8081, true));
        pool.remove(&snapshot[0]);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(port_of(&snapshot[0]), 8080);
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_concurrent_registration() {
        let pool = RoundRobinPool::new();
        std::thread::scope(|s| {
            for t in 0..8u16 {
                let pool = &pool;
                s.spawn(move || {
                    for i in 0..125u16 {
                        pool.register(MockBackend::shared(10_000 + t * 125 + i, true));
                    }
                });
            }
        });
        assert_eq!(pool.size(), 1000);
    }

    #[test]
    fn test_concurrent_rotation_is_linearizable() {
        let pool = RoundRobinPool::with_backends(
            (8080..8084).map(|p| MockBackend::shared(p, true) as SharedBackend),
        );
        let picks: Vec<u16> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let pool = &pool;
                    s.spawn(move || {
                        (0..100)
                            .map(|_| port_of(&pool.next_available().unwrap()))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
        });

        // No two rotations started from the same cursor, so the load is exactly even.
        let mut counts: HashMap<u16, usize> = HashMap::new();
        for port in picks {
            *counts.entry(port).or_default() += 1;
        }
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&n| n == 200));
    }
}
