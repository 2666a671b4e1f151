//! Per pull request serialization of webhook deliveries.
//!
//! Two hooks for the same (repository_id, pull_request_id) must not run the
//! pointer lookup-then-create concurrently. Each key gets its own async mutex;
//! the entry is dropped once nobody holds or waits on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Key = (u64, u64);
type Slots = Arc<Mutex<HashMap<Key, Arc<AsyncMutex<()>>>>>;

#[derive(Debug, Default, Clone)]
pub struct DeliveryLocks {
    slots: Slots,
}

/// Held for the duration of one delivery.
#[derive(Debug)]
pub struct DeliveryGuard {
    // Field order matters: the mutex guard drops before `release` runs.
    _guard: OwnedMutexGuard<()>,
    _release: Release,
}

/// Drops the map entry once nobody holds or waits on it. Armed before the
/// wait starts, so a cancelled `acquire` cleans up as well.
#[derive(Debug)]
struct Release {
    key: Key,
    slots: Slots,
}

impl DeliveryLocks {
    pub async fn acquire(&self, repository_id: u64, pull_request_id: u64) -> DeliveryGuard {
        let key = (repository_id, pull_request_id);
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            slots.entry(key).or_default().clone()
        };
        let release = Release {
            key,
            slots: self.slots.clone(),
        };
        DeliveryGuard {
            _guard: slot.lock_owned().await,
            _release: release,
        }
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
        // Map entry is the only remaining reference: no holder, no waiter.
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = DeliveryLocks::default();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            tasks.push(tokio::spawn(async move {
                let _g = locks.acquire(1, 2).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn abandoned_waiter_leaves_no_entry() {
        let locks = DeliveryLocks::default();
        let holder = locks.acquire(1, 2).await;

        let gave_up = tokio::time::timeout(Duration::from_millis(20), locks.acquire(1, 2)).await;
        assert!(gave_up.is_err());
        assert_eq!(locks.len(), 1);
        drop(holder);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn waiter_cancelled_after_holder_released_leaves_no_entry() {
        let locks = DeliveryLocks::default();
        let holder = locks.acquire(1, 2).await;
        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.acquire(1, 2).await;
                std::future::pending::<()>().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        drop(holder);
        waiter.abort();
        let _ = waiter.await;
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = DeliveryLocks::default();
        let _a = locks.acquire(1, 2).await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire(1, 3)).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
