use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;

/// Per-user mutual exclusion for cart mutations and checkout.
///
/// Entries are created on demand and dropped once no task holds or waits on
/// them. Scope is this process only.
#[derive(Clone, Default)]
pub struct UserLocks {
    locks: Arc<AsyncMutex<HashMap<i32, Arc<AsyncMutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding `user_id`'s lock.
    pub async fn with_lock<F, Fut, T>(&self, user_id: i32, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let lock = self.acquire(user_id).await;
        let guard = lock.lock().await;
        let result = f().await;
        drop(guard);
        self.release(user_id, lock).await;
        result
    }

    /// Number of users with a live lock entry.
    pub async fn active(&self) -> usize {
        self.locks.lock().await.len()
    }

    async fn acquire(&self, user_id: i32) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(user_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn release(&self, user_id: i32, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self.locks.lock().await;
        // one reference in the map, one here
        if Arc::strong_count(&lock) == 2 {
            if let Some(existing) = locks.get(&user_id) {
                if Arc::ptr_eq(existing, &lock) {
                    locks.remove(&user_id);
                }
            }
        }
    }
}
