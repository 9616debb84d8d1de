// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory object store fake for testing without filesystem I/O.

use blueprint_installation::{ObjectStore, StoreError};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory implementation of [`ObjectStore`] for testing.
///
/// Clones share state, so a test can hand one clone to an installation and
/// inspect the other. Call counters and failure toggles cover error paths.
///
/// # Example
///
/// ```
/// use blueprint_dry_tests::InMemoryObjectStore;
/// use blueprint_installation::ObjectStore;
///
/// let store = InMemoryObjectStore::new();
/// store.write("/Applications/demo/config.json", b"{}").unwrap();
/// assert_eq!(store.list("/Applications/demo/").unwrap().len(), 1);
/// assert_eq!(store.read_count(), 0);
/// assert_eq!(store.write_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    inner: Arc<Mutex<InMemoryObjectStoreInner>>,
}

#[derive(Default)]
struct InMemoryObjectStoreInner {
    data: BTreeMap<String, Vec<u8>>,
    read_count: usize,
    write_count: usize,
    delete_count: usize,
    fail_on_read: bool,
    fail_on_write: bool,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given objects.
    pub fn with_data(data: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(InMemoryObjectStoreInner {
                data: data.into_iter().collect(),
                ..Default::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryObjectStoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Configure the store to fail on read operations.
    pub fn set_fail_on_read(&self, fail: bool) {
        self.lock().fail_on_read = fail;
    }

    /// Configure the store to fail on write operations.
    pub fn set_fail_on_write(&self, fail: bool) {
        self.lock().fail_on_write = fail;
    }

    /// Number of `read` calls, including failed ones.
    pub fn read_count(&self) -> usize {
        self.lock().read_count
    }

    /// Number of `write` calls, including failed ones.
    pub fn write_count(&self) -> usize {
        self.lock().write_count
    }

    /// Number of `delete` calls, including ones that matched nothing.
    pub fn delete_count(&self) -> usize {
        self.lock().delete_count
    }

    /// All keys currently present, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.lock().data.keys().cloned().collect()
    }

    /// Check if a key exists in the store.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().data.contains_key(key)
    }

    /// Stored bytes of `key`, without touching the read counter.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().data.get(key).cloned()
    }

    /// Reset the store to its initial empty state: data, counters and failure toggles.
    pub fn reset(&self) {
        *self.lock() = InMemoryObjectStoreInner::default();
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let mut inner = self.lock();
        inner.read_count += 1;

        if inner.fail_on_read {
            return Err(StoreError::Other("simulated read failure".into()));
        }

        inner
            .data
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.write_count += 1;

        if inner.fail_on_write {
            return Err(StoreError::Other("simulated write failure".into()));
        }

        inner.data.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let inner = self.lock();
        if inner.fail_on_read {
            return Err(StoreError::Other("simulated list failure".into()));
        }
        Ok(inner
            .data
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner.delete_count += 1;

        if inner.fail_on_write {
            return Err(StoreError::Other("simulated delete failure".into()));
        }

        let folder = format!("{}/", key.trim_end_matches('/'));
        let before = inner.data.len();
        inner
            .data
            .retain(|stored, _| stored != key && !stored.starts_with(&folder));
        if inner.data.len() == before {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }
}
