//! Per-volume-name serialisation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per volume name.
///
/// Operations on the same name queue behind each other; different names
/// never contend.
#[derive(Debug, Default)]
pub struct NameLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl NameLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `name`.
    ///
    /// The entry for `name` is released when the returned guard drops and no
    /// other caller is waiting on it.
    pub async fn lock(&self, name: &str) -> NameGuard<'_> {
        // Clone the Arc out so the map shard is not held across the await.
        let mutex = Arc::clone(
            self.locks
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        NameGuard {
            locks: self,
            name: name.to_owned(),
            guard: Some(mutex.lock_owned().await),
        }
    }

    /// Drop the mutex for `name` if nobody holds or awaits it.
    pub fn release(&self, name: &str) {
        self.locks
            .remove_if(name, |_, mutex| Arc::strong_count(mutex) == 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Exclusive access to one name; see [`NameLocks::lock`].
#[derive(Debug)]
pub struct NameGuard<'a> {
    locks: &'a NameLocks,
    name: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for NameGuard<'_> {
    fn drop(&mut self) {
        // Unlock first so the entry's only remaining reference is the map's.
        drop(self.guard.take());
        self.locks.release(&self.name);
    }
}
