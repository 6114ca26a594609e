//! Per-owner write serialization.
//!
//! Every priority-mutating write for an owner runs while holding that
//! owner's guard, so two writers for the same owner can never interleave
//! their read and write phases. Owners never share a mutex.

use crate::error::{Result, TasklineError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry size above which idle entries are dropped on the next acquire.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct OwnerLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

/// Held for the lifetime of one owner-scoped transaction.
///
/// Dropping it (on commit, error, or cancellation) releases the owner.
#[derive(Debug)]
pub struct OwnerGuard {
    owner: String,
    _guard: OwnedMutexGuard<()>,
}

impl OwnerGuard {
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl OwnerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for exclusive access to `owner`.
    pub async fn acquire(&self, owner: &str, timeout: Duration) -> Result<OwnerGuard> {
        let lock = self.lock_for(owner);

        match tokio::time::timeout(timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(OwnerGuard {
                owner: owner.to_string(),
                _guard: guard,
            }),
            Err(_) => {
                tracing::warn!(owner, timeout_ms = timeout.as_millis() as u64, "Owner lock timed out");
                Err(TasklineError::LockContention(owner.to_string()))
            },
        }
    }

    #[cfg(test)]
    fn tracked_owners(&self) -> usize {
        self.registry().len()
    }

    fn lock_for(&self, owner: &str) -> Arc<AsyncMutex<()>> {
        let mut registry = self.registry();

        if registry.len() >= PRUNE_THRESHOLD {
            // Only the registry references an idle entry
            registry.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        registry.entry(owner.to_string()).or_default().clone()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        // The map holds no invariants a panicking holder could break
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
