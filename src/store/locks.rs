//! Per-loan mutual exclusion

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Entries beyond this many trigger a sweep of idle locks.
const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per loan id, used by the in-process store.
///
/// Holding the guard serializes the read-check-write sequence for that loan;
/// other loans are unaffected. Clones share the same table.
#[derive(Clone, Default)]
pub struct LoanLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl LoanLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, loan_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() > PRUNE_THRESHOLD {
                // a lock only the map refers to is neither held nor awaited
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(loan_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}
