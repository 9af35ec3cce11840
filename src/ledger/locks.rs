//! Per-item write locks

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Unused slots are dropped once the table grows past this size
const PRUNE_THRESHOLD: usize = 256;

/// One async mutex per ISBN. Held from reading the current state until the
/// cache has applied the committed change, so two writers of the same item
/// never interleave while writers of different items run in parallel.
#[derive(Debug, Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, isbn: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if slots.len() > PRUNE_THRESHOLD {
                // Only the table holds these, nobody is waiting on them
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            slots.entry(isbn.to_string()).or_default().clone()
        };
        slot.lock_owned().await
    }
}
