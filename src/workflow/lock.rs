use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::model::global_error::{AppError, ErrorCode};

// idle entries are pruned once the registry grows past this
const PRUNE_THRESHOLD: usize = 1024;

/// Per-bug exclusive locks held for the whole read-validate-write of a mutation.
pub struct BugLocks {
    locks: Mutex<HashMap<i32, Arc<AsyncMutex<()>>>>,
    timeout: Duration,
}

#[must_use = "the bug stays locked only while the guard is alive"]
pub struct BugLockGuard {
    bug_id: i32,
    _guard: OwnedMutexGuard<()>,
}

impl BugLockGuard {
    pub fn bug_id(&self) -> i32 {
        self.bug_id
    }
}

impl BugLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Waits up to the configured timeout, then gives up with `ConcurrencyConflict`.
    pub async fn acquire(&self, bug_id: i32) -> Result<BugLockGuard, AppError> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if locks.len() > PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(bug_id).or_default().clone()
        };

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(BugLockGuard { bug_id, _guard: guard }),
            Err(_) => Err(AppError::with_detail(
                ErrorCode::ConcurrencyConflict,
                format!("bug #{} is locked by another operation", bug_id),
            )),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_acquire_times_out_while_held() {
        let locks = BugLocks::new(Duration::from_millis(20));
        let guard = locks.acquire(1).await.unwrap();
        assert_eq!(guard.bug_id(), 1);

        let err = locks.acquire(1).await.err().unwrap();
        assert_eq!(err.code(), ErrorCode::ConcurrencyConflict);

        drop(guard);
        assert!(locks.acquire(1).await.is_ok());
    }

    #[tokio::test]
    async fn different_bugs_do_not_contend() {
        let locks = BugLocks::new(Duration::from_millis(20));
        let _first = locks.acquire(1).await.unwrap();
        assert!(locks.acquire(2).await.is_ok());
    }
}
