// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Storage port for installation files (keyed by slash-separated path).

use thiserror::Error;

/// Path-addressable object store with per-key overwrite.
///
/// Keys look like absolute paths (`/Users/alice/.product/config.yml`); a
/// "folder" is any key prefix ending just before a `/`.
pub trait ObjectStore {
    /// Read an object. Returns `NotFound` when missing.
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;
    /// Create or replace an object.
    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;
    /// Keys starting with `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
    /// Delete `key` and every key beneath `key/`. Returns `NotFound` when nothing matched.
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// True when at least one key lives under `folder`.
    fn exists(&self, folder: &str) -> Result<bool, StoreError> {
        let prefix = format!("{}/", folder.trim_end_matches('/'));
        Ok(!self.list(&prefix)?.is_empty())
    }
}

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key not present in store.
    #[error("not found: {0}")]
    NotFound(String),
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

impl<S: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<S> {
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        (**self).write(key, data)
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).list(prefix)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn exists(&self, folder: &str) -> Result<bool, StoreError> {
        (**self).exists(folder)
    }
}
