//! Per-setlist write serialization
//!
//! Entry mutations for one setlist run one at a time; different setlists
//! proceed in parallel. A slot lives only while someone holds or waits for
//! it, so ids that never resolve to a setlist leave nothing behind.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type Slots = Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>;

#[derive(Debug, Default, Clone)]
pub struct SetlistLocks {
    inner: Slots,
}

/// Exclusive write access to one setlist, released on drop
#[derive(Debug)]
pub struct SetlistGuard {
    guard: Option<OwnedMutexGuard<()>>,
    setlist_id: Uuid,
    slots: Slots,
}

impl Drop for SetlistGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        // Waiters hold their own reference; only the map's copy means idle
        if let Some(slot) = map.get(&self.setlist_id) {
            if Arc::strong_count(slot) == 1 {
                map.remove(&self.setlist_id);
            }
        }
    }
}

impl SetlistLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, setlist_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(setlist_id).or_default().clone()
    }

    /// Wait for exclusive write access to one setlist
    pub async fn lock(&self, setlist_id: Uuid) -> SetlistGuard {
        let guard = self.slot(setlist_id).lock_owned().await;
        SetlistGuard {
            guard: Some(guard),
            setlist_id,
            slots: Arc::clone(&self.inner),
        }
    }

    /// Number of live slots
    pub fn slot_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}
