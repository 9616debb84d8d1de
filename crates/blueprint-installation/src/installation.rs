// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Product-scoped folder of typed files in an [`ObjectStore`].

use std::fmt;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use blueprint_marshal::{Descriptor, Document, Marshaller, Typed};
use tracing::{debug, warn};

use crate::codec::{self, Format};
use crate::error::InstallationError;
use crate::store::{ObjectStore, StoreError};

/// Folder holding every typed file of one product installation.
///
/// Typed files are addressed by filename; the extension picks the codec.
/// One lock per installation serializes store access, so [`update`](Self::update)
/// cannot lose writes to a concurrent caller on the same instance.
pub struct Installation<S> {
    store: S,
    product: String,
    install_folder: String,
    marshaller: Marshaller,
    lock: Mutex<()>,
}

impl<S> Installation<S> {
    /// Installation of `product` rooted at `install_folder`.
    pub fn new(store: S, product: impl Into<String>, install_folder: impl Into<String>) -> Self {
        Self {
            store,
            product: product.into(),
            install_folder: install_folder.into().trim_end_matches('/').to_string(),
            marshaller: Marshaller::new(),
            lock: Mutex::new(()),
        }
    }

    /// Installation in the home folder of `user`: `/Users/<user>/.<product>`.
    pub fn assume_user_home(store: S, product: impl Into<String>, user: &str) -> Self {
        let product = product.into();
        let folder = user_home_folder(&product, user);
        Self::new(store, product, folder)
    }

    /// Installation in the shared folder: `/Applications/<product>`.
    pub fn assume_global(store: S, product: impl Into<String>) -> Self {
        let product = product.into();
        let folder = global_folder(&product);
        Self::new(store, product, folder)
    }

    /// Replace the marshaller used for typed files.
    pub fn with_marshaller(mut self, marshaller: Marshaller) -> Self {
        self.marshaller = marshaller;
        self
    }

    /// Product name.
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Folder holding the installation's files.
    pub fn install_folder(&self) -> &str {
        &self.install_folder
    }

    /// True when installed in the shared `/Applications` folder.
    pub fn is_global(&self) -> bool {
        self.install_folder == global_folder(&self.product)
    }

    /// Name of the folder containing the installation folder (the user for home installs).
    pub fn username(&self) -> &str {
        let parent = self
            .install_folder
            .rsplit_once('/')
            .map_or("", |(parent, _)| parent);
        parent.rsplit_once('/').map_or(parent, |(_, name)| name)
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Full store key of `filename`.
    pub fn path_of(&self, filename: &str) -> String {
        format!("{}/{}", self.install_folder, filename.trim_start_matches('/'))
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: ObjectStore> Installation<S> {
    /// First existing installation of `product`: the home folder of `user`, then the global one.
    ///
    /// With `assume_user`, a missing installation resolves to the user home
    /// folder instead of failing with `NotInstalled`.
    pub fn current(
        store: S,
        product: impl Into<String>,
        user: &str,
        assume_user: bool,
    ) -> Result<Self, InstallationError> {
        let product = product.into();
        let user_folder = user_home_folder(&product, user);
        for candidate in [user_folder.clone(), global_folder(&product)] {
            if store.exists(&candidate)? {
                return Ok(Self::new(store, product, candidate));
            }
            debug!(product = %product, folder = %candidate, "not installed here");
        }
        if assume_user {
            return Ok(Self::new(store, product, user_folder));
        }
        Err(InstallationError::NotInstalled(product))
    }

    /// Every existing installation of `product`: the global folder, then each user's home.
    pub fn existing<'u>(
        store: &S,
        product: &str,
        users: impl IntoIterator<Item = &'u str>,
    ) -> Result<Vec<Self>, InstallationError>
    where
        S: Clone,
    {
        let candidates = std::iter::once(global_folder(product))
            .chain(users.into_iter().map(|user| user_home_folder(product, user)));
        let mut found = Vec::new();
        for folder in candidates {
            if store.exists(&folder)? {
                found.push(Self::new(store.clone(), product, folder));
            }
        }
        Ok(found)
    }

    /// Load `T` from its inferred filename. Fails with `NotFound` when the file is absent.
    pub fn load<T: Typed>(&self) -> Result<T, InstallationError> {
        let filename = filename_for(&T::descriptor())?;
        self.load_from(&filename)
    }

    /// Load `T` from `filename`.
    ///
    /// Missing files fail with `NotFound`; unreadable ones are treated as empty.
    pub fn load_from<T: Typed>(&self, filename: &str) -> Result<T, InstallationError> {
        let descriptor = T::descriptor();
        let document = {
            let _guard = self.guard();
            self.read_document(filename, &descriptor)?
        };
        Ok(self.marshaller.from_document(document, filename)?)
    }

    /// Load `T`, falling back to its defaults when the file does not exist.
    pub fn load_or_default<T: Typed>(&self) -> Result<T, InstallationError> {
        let descriptor = T::descriptor();
        let filename = filename_for(&descriptor)?;
        let document = {
            let _guard = self.guard();
            self.read_or_empty(&filename, &descriptor)?
        };
        Ok(self.marshaller.from_document(document, &filename)?)
    }

    /// Load `T` from a local file, through the same codecs and migrations.
    pub fn load_local<T: Typed>(&self, file: &Path) -> Result<T, InstallationError> {
        let descriptor = T::descriptor();
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let format = format_of(&name)?;
        let raw = std::fs::read(file).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => {
                InstallationError::NotFound(file.display().to_string())
            }
            _ => InstallationError::Store(StoreError::Io(err)),
        })?;
        let document = decode_or_empty(format, &raw, &descriptor, &name);
        Ok(self.marshaller.from_document(document, &name)?)
    }

    /// Save `value` under its inferred filename and return the full path.
    pub fn save<T: Typed>(&self, value: &T) -> Result<String, InstallationError> {
        let filename = filename_for(&T::descriptor())?;
        self.save_as(value, &filename)
    }

    /// Save `value` as `filename` and return the full path.
    pub fn save_as<T: Typed>(&self, value: &T, filename: &str) -> Result<String, InstallationError> {
        let raw = self.encode(value, filename)?;
        let _guard = self.guard();
        self.write_raw(filename, &raw)
    }

    /// Load `T` (or its defaults), apply `mutate`, and save it back, all under the lock.
    ///
    /// The lock is not reentrant: `mutate` must not call back into this
    /// installation (`load`, `save`, `upload`, ...) or it deadlocks.
    pub fn update<T, F>(&self, mutate: F) -> Result<T, InstallationError>
    where
        T: Typed,
        F: FnOnce(&mut T),
    {
        let descriptor = T::descriptor();
        let filename = filename_for(&descriptor)?;
        let _guard = self.guard();
        let document = self.read_or_empty(&filename, &descriptor)?;
        let mut value: T = self.marshaller.from_document(document, &filename)?;
        mutate(&mut value);
        let raw = self.encode(&value, &filename)?;
        self.write_raw(&filename, &raw)?;
        Ok(value)
    }

    /// Write raw bytes as `filename` and return the full path.
    pub fn upload(&self, filename: &str, raw: &[u8]) -> Result<String, InstallationError> {
        let _guard = self.guard();
        self.write_raw(filename, raw)
    }

    /// Full paths of every file in the installation folder.
    pub fn files(&self) -> Result<Vec<String>, InstallationError> {
        Ok(self.store.list(&format!("{}/", self.install_folder))?)
    }

    /// Delete the installation folder with everything in it.
    pub fn remove(&self) -> Result<(), InstallationError> {
        let _guard = self.guard();
        debug!(folder = %self.install_folder, "removing installation");
        Ok(self.store.delete(&self.install_folder)?)
    }

    fn encode<T: Typed>(&self, value: &T, filename: &str) -> Result<Vec<u8>, InstallationError> {
        let format = format_of(filename)?;
        let descriptor = T::descriptor();
        let document = self.marshaller.to_document(value)?;
        debug!(descriptor = %descriptor, %format, "encoding");
        Ok(format.encode(&document, &descriptor)?)
    }

    fn write_raw(&self, filename: &str, raw: &[u8]) -> Result<String, InstallationError> {
        let path = self.path_of(filename);
        debug!(path = %path, bytes = raw.len(), "uploading");
        self.store.write(&path, raw)?;
        Ok(path)
    }

    fn read_document(
        &self,
        filename: &str,
        descriptor: &Descriptor,
    ) -> Result<Document, InstallationError> {
        let format = format_of(filename)?;
        let path = self.path_of(filename);
        debug!(path = %path, "loading");
        let raw = self.store.read(&path)?;
        Ok(decode_or_empty(format, &raw, descriptor, &path))
    }

    fn read_or_empty(
        &self,
        filename: &str,
        descriptor: &Descriptor,
    ) -> Result<Document, InstallationError> {
        match self.read_document(filename, descriptor) {
            Err(InstallationError::NotFound(_)) => Ok(codec::empty_document(descriptor)),
            other => other,
        }
    }
}

impl<S> fmt::Debug for Installation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installation")
            .field("product", &self.product)
            .field("install_folder", &self.install_folder)
            .finish_non_exhaustive()
    }
}

impl<S> fmt::Display for Installation<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.install_folder)
    }
}

/// Installations are equal when they share a folder.
impl<S> PartialEq for Installation<S> {
    fn eq(&self, other: &Self) -> bool {
        self.install_folder == other.install_folder
    }
}

impl<S> Eq for Installation<S> {}

impl<S> std::hash::Hash for Installation<S> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.install_folder.hash(state);
    }
}

fn user_home_folder(product: &str, user: &str) -> String {
    format!("/Users/{user}/.{product}")
}

fn global_folder(product: &str) -> String {
    format!("/Applications/{product}")
}

fn format_of(filename: &str) -> Result<Format, InstallationError> {
    Format::from_filename(filename)
        .ok_or_else(|| InstallationError::UnknownExtension(codec::extension(filename).to_string()))
}

// Corrupt, blank or `null` files read as empty so first-run bootstrap still works.
fn decode_or_empty(format: Format, raw: &[u8], descriptor: &Descriptor, path: &str) -> Document {
    match format.decode(raw, descriptor) {
        Ok(Document::Null) => {
            debug!(path = %path, "empty {format} file, treating as empty");
            codec::empty_document(descriptor)
        }
        Ok(document) => document,
        Err(err) => {
            warn!(path = %path, error = %err, "cannot decode {format}, treating as empty");
            codec::empty_document(descriptor)
        }
    }
}

/// Filename for a shape: the composite's declared file, else its kebab-case name plus `.json`.
///
/// Lists of records use the record's filename.
pub fn filename_for(descriptor: &Descriptor) -> Result<String, InstallationError> {
    let composite = match descriptor {
        Descriptor::Composite(composite) => Some(composite),
        Descriptor::Sequence(element) => element.as_composite(),
        _ => None,
    };
    let composite =
        composite.ok_or_else(|| InstallationError::MissingFilename(descriptor.to_string()))?;
    Ok(match composite.declared_file() {
        Some(file) => file.to_string(),
        None => format!("{}.json", kebab_case(composite.name())),
    })
}

/// `WorkspaceConfig` → `workspace-config`.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('-');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_marshal::{CompositeDescriptor, PrimitiveKind};

    #[test]
    fn kebab_case_splits_on_every_capital() {
        assert_eq!(kebab_case("WorkspaceConfig"), "workspace-config");
        assert_eq!(kebab_case("ABC"), "a-b-c");
        assert_eq!(kebab_case("state"), "state");
    }

    #[test]
    fn filename_prefers_declared_file() {
        let declared: Descriptor = CompositeDescriptor::new("RawState").file("state.json").into();
        assert_eq!(filename_for(&declared).unwrap(), "state.json");

        let inferred: Descriptor = CompositeDescriptor::new("PolicyInfo").into();
        assert_eq!(filename_for(&inferred).unwrap(), "policy-info.json");
        assert_eq!(
            filename_for(&Descriptor::sequence(inferred)).unwrap(),
            "policy-info.json"
        );

        let err = filename_for(&Descriptor::Primitive(PrimitiveKind::Int)).unwrap_err();
        assert!(matches!(err, InstallationError::MissingFilename(_)));
    }

    #[test]
    fn folders_follow_product_conventions() {
        let home = Installation::assume_user_home((), "blueprint", "alice@example.com");
        assert_eq!(home.install_folder(), "/Users/alice@example.com/.blueprint");
        assert_eq!(home.username(), "alice@example.com");
        assert!(!home.is_global());

        let global = Installation::assume_global((), "blueprint");
        assert_eq!(global.install_folder(), "/Applications/blueprint");
        assert!(global.is_global());
        assert_eq!(global.to_string(), "/Applications/blueprint");
        assert_eq!(global.path_of("config.yml"), "/Applications/blueprint/config.yml");
    }

    #[test]
    fn blank_and_null_files_decode_as_empty() {
        let record: Descriptor = CompositeDescriptor::new("Plain").into();
        let rows = Descriptor::sequence(record.clone());
        for raw in [&b""[..], &b"null"[..], &b"~\n"[..]] {
            assert_eq!(
                decode_or_empty(Format::Yaml, raw, &record, "plain.yml"),
                serde_json::json!({})
            );
        }
        assert_eq!(
            decode_or_empty(Format::Json, b"null", &rows, "plain.json"),
            serde_json::json!([])
        );
    }

    #[test]
    fn unknown_extension_names_the_extension() {
        let err = format_of("notes.txt").unwrap_err();
        assert_eq!(err.to_string(), "unknown extension: txt");
    }
}
