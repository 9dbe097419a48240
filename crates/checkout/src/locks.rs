//! Per-basket mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use domain::BasketId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-process async locks keyed by basket id.
///
/// Every use case, including reads that may recalculate, holds the guard of
/// its basket for its whole duration. Entries nobody holds or waits for are
/// dropped on the next acquire, so the map only grows with the number of
/// baskets in use at the same time.
#[derive(Debug, Clone, Default)]
pub struct BasketLocks {
    locks: Arc<Mutex<HashMap<BasketId, Arc<Mutex<()>>>>>,
}

impl BasketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until the basket is free and returns its guard.
    pub async fn acquire(&self, id: BasketId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            retain_busy(&mut locks);
            Arc::clone(locks.entry(id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drops the entries of baskets nobody holds or waits for.
    pub async fn prune_idle(&self) -> usize {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        retain_busy(&mut locks);
        before - locks.len()
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}

/// The map holds one reference; any other is a guard or a waiter.
fn retain_busy(locks: &mut HashMap<BasketId, Arc<Mutex<()>>>) {
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
}
