use dashrun_types::{Identity, SessionToken};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Advisory lock scope: one entry per identity (ticket refresh/consume,
/// record persistence) or per session token (consume check-and-set).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LockKey {
    Identity(Identity),
    Session(SessionToken),
}

/// Per-key advisory locks serializing check-then-act sequences.
///
/// The store itself only guarantees per-call atomicity, so any sequence that
/// reads, decides, and writes back must hold the relevant entry here for its
/// whole duration. Entries are tiny and kept for the process lifetime.
#[derive(Default)]
pub struct LockTable {
    entries: StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let entry = {
            let mut entries = self.entries.lock().expect("lock table poisoned");
            entries.entry(key).or_default().clone()
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_same_key_serializes() {
        let table = Arc::new(LockTable::new());
        let in_section = Arc::new(AtomicU32::new(0));
        let key = LockKey::Identity(Identity([1u8; 32]));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let table = table.clone();
            let in_section = in_section.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let _guard = table.acquire(key).await;
                assert_eq!(in_section.fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                assert_eq!(in_section.fetch_sub(1, Ordering::SeqCst), 1);
            }));
        }
        for handle in handles {
            handle.await.expect("task");
        }
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let table = LockTable::new();
        let guard_a = table
            .acquire(LockKey::Identity(Identity([1u8; 32])))
            .await;
        let guard_b = table
            .acquire(LockKey::Session(SessionToken([1u8; 32])))
            .await;
        drop(guard_a);
        drop(guard_b);
    }
}
