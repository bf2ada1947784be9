//! In-process store for tests and ephemeral sessions.

use super::{normalize_key, KvStore, StoreError, StoreResult};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// `BTreeMap`-backed store; contents vanish with the value.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
    read_only: AtomicBool,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with `entries`.
    pub fn with_entries<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(key, value)| (key.into().trim().to_string(), value.into()))
            .collect();
        Self {
            entries: Mutex::new(entries),
            read_only: AtomicBool::new(false),
        }
    }

    /// Makes every following `set`/`remove` fail with `Unavailable`.
    ///
    /// Models a host that denies writes (quota exceeded, storage locked).
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Returns a copy of all entries.
    pub fn snapshot(&self) -> StoreResult<BTreeMap<String, String>> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn ensure_writable(&self) -> StoreResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is read-only".to_string()));
        }
        Ok(())
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let key = normalize_key(key)?;
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let key = normalize_key(key)?;
        self.ensure_writable()?;
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let key = normalize_key(key)?;
        self.ensure_writable()?;
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryKvStore;
    use crate::store::{KvStore, StoreError};

    #[test]
    fn set_get_remove_cycle() {
        let store = MemoryKvStore::new();
        store.set("api_url", "https://erp.local").expect("set");
        assert_eq!(
            store.get("api_url").expect("get").as_deref(),
            Some("https://erp.local")
        );

        store.remove("api_url").expect("remove");
        assert_eq!(store.get("api_url").expect("get"), None);
        store.remove("api_url").expect("removing absent key is ok");
    }

    #[test]
    fn read_only_store_rejects_writes_but_keeps_reads() {
        let store = MemoryKvStore::with_entries([("lsu", "A-17")]);
        store.set_read_only(true);

        let err = store.set("lsu", "B-02").expect_err("write must fail");
        assert!(matches!(err, StoreError::Unavailable(_)));
        let err = store.remove("lsu").expect_err("remove must fail");
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.get("lsu").expect("get").as_deref(), Some("A-17"));
    }
}
