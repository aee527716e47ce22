//! Statistics Publisher
//!
//! Publish/subscribe fan-out of cache statistics snapshots.

use crate::domain::entities::CacheStats;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked with every new statistics snapshot.
pub type StatsObserver = Arc<dyn Fn(&CacheStats) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    observers: RwLock<BTreeMap<u64, StatsObserver>>,
}

/// Synchronous statistics publisher.
///
/// Observers run in registration order on the publishing task. An
/// observer that returns an error or panics is logged and skipped; the
/// remaining observers still run.
#[derive(Clone, Default)]
pub struct StatsPublisher {
    registry: Arc<Registry>,
}

impl StatsPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. It stays registered until the returned
    /// handle is cancelled or dropped.
    #[must_use = "dropping the subscription unregisters the observer"]
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(&CacheStats) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.observers.write().insert(id, Arc::new(observer));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver a snapshot to every registered observer.
    pub fn publish(&self, stats: &CacheStats) {
        // Snapshot the list so observers may (un)subscribe while running
        let observers: Vec<(u64, StatsObserver)> = self
            .registry
            .observers
            .read()
            .iter()
            .map(|(id, o)| (*id, o.clone()))
            .collect();

        for (id, observer) in observers {
            match catch_unwind(AssertUnwindSafe(|| observer(stats))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::debug!("error notifying cache stats observer {}: {:#}", id, e);
                }
                Err(_) => {
                    tracing::debug!("cache stats observer {} panicked", id);
                }
            }
        }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.registry.observers.read().len()
    }
}

/// Handle to a registered observer.
///
/// Unregisters the observer when cancelled or dropped.
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Unregister the observer now.
    pub fn cancel(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.observers.write().remove(&self.id);
        }
    }
}
