//! Named, timeout-bounded mutual exclusion.
//!
//! The lock domain is coarse: one key covers every operation that mutates
//! the shared balance/position chains. The per-scope caches sequence
//! arithmetic inside one operation; this lock serializes operations against
//! each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{CoreError, Result};

/// Contention domain of every financial-balance and position mutation.
pub const FINANCIALS_AND_POSITIONS: &str = "financials-and-positions";

/// Exclusive hold on a contention-domain key.
///
/// Dropping the guard releases the key. Since release happens on every exit
/// path (return, `?`, panic unwind), holding a guard across the mutating
/// section gives the acquire/release-in-finally discipline by construction.
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        debug!("released lock {:?}", self.key);
    }
}

/// Keyed exclusive locks with a bounded acquisition wait.
///
/// Any backing that honors the acquire-within-timeout/release contract
/// would do; this one is an in-process mutex map, which covers a single
/// logical lock domain.
pub struct RequestLock {
    timeout: Duration,
    slots: StdMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RequestLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            slots: StdMutex::new(HashMap::new()),
        }
    }

    /// Waits up to the configured timeout for an exclusive hold on `key`.
    ///
    /// On timeout the operation must not have mutated anything; the caller
    /// receives [`CoreError::LockTimeout`] with the key and elapsed wait.
    pub async fn acquire(&self, key: &str) -> Result<LockGuard> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let started = Instant::now();
        match tokio::time::timeout(self.timeout, slot.lock_owned()).await {
            Ok(guard) => {
                debug!("acquired lock {:?} after {:?}", key, started.elapsed());
                Ok(LockGuard {
                    key: key.to_string(),
                    _guard: guard,
                })
            }
            Err(_) => {
                let waited = started.elapsed();
                warn!("lock {:?} not acquired within {:?}", key, waited);
                Err(CoreError::LockTimeout {
                    key: key.to_string(),
                    waited,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_and_reacquire_after_release() {
        let lock = RequestLock::new(Duration::from_millis(100));
        let guard = lock.acquire(FINANCIALS_AND_POSITIONS).await.unwrap();
        assert_eq!(guard.key(), FINANCIALS_AND_POSITIONS);
        drop(guard);

        // Released keys are immediately acquirable again.
        lock.acquire(FINANCIALS_AND_POSITIONS).await.unwrap();
    }

    #[tokio::test]
    async fn test_timeout_reports_key_and_wait() {
        let lock = RequestLock::new(Duration::from_millis(50));
        let _held = lock.acquire("ledger").await.unwrap();

        let err = lock.acquire("ledger").await.unwrap_err();
        match err {
            CoreError::LockTimeout { key, waited } => {
                assert_eq!(key, "ledger");
                assert!(waited >= Duration::from_millis(50));
            }
            other => panic!("expected LockTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let lock = RequestLock::new(Duration::from_millis(50));
        let _held = lock.acquire("ledger").await.unwrap();
        lock.acquire("reference-data").await.unwrap();
    }
}
