use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::SessionKey;

type Registry = Arc<Mutex<HashMap<SessionKey, Arc<AsyncMutex<()>>>>>;

/// Registry of per-session async locks.
///
/// Holding a [`SessionGuard`] serializes the get-mutate-write sequence for one
/// session while leaving every other session free to proceed. Entries are
/// removed as soon as the last holder or waiter goes away, so the registry
/// only ever contains sessions with in-flight work.
#[derive(Clone, Default)]
pub struct UserLocks {
    registry: Registry,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to the session.
    pub async fn acquire(&self, key: &SessionKey) -> SessionGuard {
        let lock = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(registry.entry(key.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        SessionGuard {
            key: key.clone(),
            registry: Arc::clone(&self.registry),
            _guard: guard,
        }
    }

    /// Returns how many sessions currently have a holder or waiter.
    pub fn active(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive access to one session; released on drop.
pub struct SessionGuard {
    key: SessionKey,
    registry: Registry,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the registry plus the one held by `_guard`.
        if registry
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) <= 2)
        {
            registry.remove(&self.key);
        }
    }
}
