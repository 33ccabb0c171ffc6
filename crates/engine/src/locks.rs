//! Keyed mutual exclusion with bounded acquisition
//!
//! Cross-entity mutations serialize per member (ledger + streak) and per
//! goal (contribution + total). Operations on different keys run in
//! parallel; acquisition is bounded, and a timeout surfaces as a retryable
//! `ConcurrencyConflict` with nothing applied.

use fitforge_core::{Error, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Entries kept after a prune pass; bounds the key map between bursts
const PRUNE_THRESHOLD: usize = 1024;

/// Map of per-key async mutexes
pub struct KeyedLocks {
    locks: Mutex<HashMap<(&'static str, i64), Arc<AsyncMutex<()>>>>,
    timeout: Duration,
}

impl KeyedLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Acquire the lock for `(scope, id)`, waiting at most the configured
    /// timeout. The guard releases on drop.
    pub async fn acquire(&self, scope: &'static str, id: i64) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut map = self
                .locks
                .lock()
                .map_err(|_| Error::Database("lock table poisoned".to_string()))?;

            if map.len() > PRUNE_THRESHOLD {
                // Drop idle entries; anyone holding or waiting keeps a clone
                map.retain(|_, l| Arc::strong_count(l) > 1);
            }

            map.entry((scope, id))
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => Err(Error::ConcurrencyConflict {
                resource: format!("{scope}:{id}"),
                timeout_ms: self.timeout.as_millis() as u64,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = Arc::new(KeyedLocks::new(Duration::from_secs(5)));
        let counter = Arc::new(Mutex::new(0_i32));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let counter = counter.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("member", 1).await.unwrap();
                let value = *counter.lock().unwrap();
                tokio::task::yield_now().await;
                *counter.lock().unwrap() = value + 1;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Without serialization the read-yield-write pattern loses updates
        assert_eq!(*counter.lock().unwrap(), 8);
    }

    #[tokio::test]
    async fn test_timeout_is_retryable_conflict() {
        let locks = KeyedLocks::new(Duration::from_millis(10));
        let _held = locks.acquire("member", 42).await.unwrap();

        let err = locks.acquire("member", 42).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, Error::ConcurrencyConflict { .. }));
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new(Duration::from_millis(50));
        let _member_one = locks.acquire("member", 1).await.unwrap();

        // A different member and a different scope both acquire immediately
        let _member_two = locks.acquire("member", 2).await.unwrap();
        let _goal_one = locks.acquire("goal", 1).await.unwrap();
    }
}
