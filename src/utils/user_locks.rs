use std::sync::Arc;
use std::time::Duration;

use futures::lock::Mutex;
use moka::future::Cache;

/// Per-user async mutexes serialising the read-then-write steps of an
/// attendance operation.
///
/// Entries expire after `idle` without use, so the map stays bounded by the
/// number of recently active users. The store's (user_id, date) unique key
/// still backs this up if an entry is evicted while held.
#[derive(Clone)]
pub struct UserLocks {
    locks: Cache<String, Arc<Mutex<()>>>,
}

impl UserLocks {
    pub fn new(max_capacity: u64, idle: Duration) -> Self {
        Self {
            locks: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_idle(idle)
                .build(),
        }
    }

    /// Returns the mutex for `user_id`, creating it on first use.
    pub async fn for_user(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .get_with(user_id.to_string(), async { Arc::new(Mutex::new(())) })
            .await
    }
}
