// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `ObjectStore` for Blueprint tools (uses platform data dir).
#![forbid(unsafe_code)]

use blueprint_installation::{ObjectStore, StoreError};
use directories::ProjectDirs;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Store objects as files under a root directory; keys map to relative paths.
///
/// `/Users/alice/.blueprint/config.yml` lives at `<root>/Users/alice/.blueprint/config.yml`.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    base: PathBuf,
}

impl FsObjectStore {
    /// Create a store rooted at the user data directory (e.g., `~/.local/share/Blueprint`).
    pub fn new() -> Result<Self, StoreError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "Blueprint")
            .ok_or_else(|| StoreError::Other("could not resolve data dir".into()))?;
        Self::with_root(proj.data_dir())
    }

    /// Create a store rooted at `root`, creating the directory if needed.
    pub fn with_root(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base = root.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StoreError::Other(format!("key escapes the store: {key}")));
        }
        Ok(self.base.join(relative))
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(format!("/{}", parts.join("/")))
    }

    fn collect(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<(), StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(StoreError::Io(err)),
        };
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                self.collect(&path, prefix, out)?;
            } else if let Some(key) = self.key_for(&path) {
                if key.starts_with(prefix) {
                    out.push(key);
                }
            }
        }
        Ok(())
    }
}

impl ObjectStore for FsObjectStore {
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read(path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), bytes = data.len(), "writing object");
        fs::write(path, data)?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        // Walk only the deepest directory named by the prefix.
        let folder = prefix.rsplit_once('/').map_or("", |(folder, _)| folder);
        let start = self.path_for(folder)?;
        let mut keys = Vec::new();
        self.collect(&start, prefix, &mut keys)?;
        keys.sort();
        Ok(keys)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if path == self.base {
            return Err(StoreError::Other("refusing to delete the store root".into()));
        }
        debug!(path = %path.display(), "deleting");
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else if path.is_file() {
            fs::remove_file(&path)?;
        } else {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FsObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::with_root(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn write_then_read_round_trips() {
        let (dir, store) = store();
        store.write("/Applications/demo/config.yml", b"a: 1\n").unwrap();
        assert_eq!(store.read("/Applications/demo/config.yml").unwrap(), b"a: 1\n");
        assert!(dir.path().join("Applications/demo/config.yml").is_file());
    }

    #[test]
    fn missing_key_is_not_found() {
        let (_dir, store) = store();
        let err = store.read("/Applications/demo/state.json").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(key) if key == "/Applications/demo/state.json"));
    }

    #[test]
    fn keys_cannot_escape_the_root() {
        let (_dir, store) = store();
        assert!(matches!(store.write("/../escape.json", b"{}"), Err(StoreError::Other(_))));
        assert!(matches!(store.read("a/../../b"), Err(StoreError::Other(_))));
    }

    #[test]
    fn list_is_recursive_sorted_and_prefix_bound() {
        let (_dir, store) = store();
        store.write("/Applications/demo/version.json", b"{}").unwrap();
        store.write("/Applications/demo/wheels/a.whl", b"PK").unwrap();
        store.write("/Applications/demo2/version.json", b"{}").unwrap();
        assert_eq!(
            store.list("/Applications/demo/").unwrap(),
            vec!["/Applications/demo/version.json", "/Applications/demo/wheels/a.whl"]
        );
        assert!(store.list("/Users/").unwrap().is_empty());
        assert!(store.exists("/Applications/demo2").unwrap());
    }

    #[test]
    fn delete_removes_folders_and_files() {
        let (_dir, store) = store();
        store.write("/Applications/demo/version.json", b"{}").unwrap();
        store.write("/Applications/demo/wheels/a.whl", b"PK").unwrap();
        store.delete("/Applications/demo/wheels/a.whl").unwrap();
        assert_eq!(store.list("/Applications/demo/").unwrap().len(), 1);
        store.delete("/Applications/demo").unwrap();
        assert!(!store.exists("/Applications/demo").unwrap());
        assert!(matches!(
            store.delete("/Applications/demo"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(store.delete("/"), Err(StoreError::Other(_))));
    }
}
