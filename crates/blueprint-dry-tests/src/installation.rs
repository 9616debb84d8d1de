// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mock installation over [`InMemoryObjectStore`] with write assertions.

use std::ops::Deref;

use blueprint_installation::{codec, Format, Installation, InstallationError};
use blueprint_marshal::{Descriptor, Document};

use crate::store::InMemoryObjectStore;

/// Install folder of every [`MockInstallation`].
pub const MOCK_FOLDER: &str = "~/mock";

/// Product name of every [`MockInstallation`].
pub const MOCK_PRODUCT: &str = "mock";

/// Value accepted anywhere at the top level of an expected record by
/// [`MockInstallation::assert_file_written`].
pub const ANY: &str = "...";

/// Installation in [`MOCK_FOLDER`] backed by an in-memory store.
///
/// Dereferences to [`Installation`], so code under test takes it as a regular
/// installation while the test inspects what was written.
///
/// ```
/// use blueprint_dry_tests::MockInstallation;
/// use serde_json::json;
///
/// let installation = MockInstallation::new();
/// installation.upload("notes.json", br#"{"a": 1}"#).unwrap();
/// installation.assert_file_written("notes.json", &json!({"a": 1}));
/// ```
pub struct MockInstallation {
    installation: Installation<InMemoryObjectStore>,
}

impl MockInstallation {
    /// Empty mock installation.
    pub fn new() -> Self {
        Self {
            installation: Installation::new(InMemoryObjectStore::new(), MOCK_PRODUCT, MOCK_FOLDER),
        }
    }

    /// Mock installation seeded with documents, encoded by each filename's extension.
    ///
    /// CSV needs a typed row shape and cannot be seeded from a bare document;
    /// use [`with_raw_files`](Self::with_raw_files) for it. A filename without a
    /// known extension is [`InstallationError::UnknownExtension`].
    pub fn with_files<'a>(
        files: impl IntoIterator<Item = (&'a str, Document)>,
    ) -> Result<Self, InstallationError> {
        let raw = files
            .into_iter()
            .map(|(filename, document)| {
                let format = Format::from_filename(filename).ok_or_else(|| {
                    InstallationError::UnknownExtension(codec::extension(filename).to_string())
                })?;
                let bytes = format.encode(&document, &Descriptor::infer_document(&document))?;
                Ok((filename, bytes))
            })
            .collect::<Result<Vec<_>, InstallationError>>()?;
        Ok(Self::with_raw_files(raw))
    }

    /// Mock installation seeded with raw file contents.
    pub fn with_raw_files<'a>(files: impl IntoIterator<Item = (&'a str, Vec<u8>)>) -> Self {
        let data = files
            .into_iter()
            .map(|(filename, raw)| (format!("{MOCK_FOLDER}/{filename}"), raw));
        Self {
            installation: Installation::new(
                InMemoryObjectStore::with_data(data),
                MOCK_PRODUCT,
                MOCK_FOLDER,
            ),
        }
    }

    /// The wrapped installation.
    pub fn installation(&self) -> &Installation<InMemoryObjectStore> {
        &self.installation
    }

    /// Raw bytes last written as `filename`.
    pub fn uploaded(&self, filename: &str) -> Option<Vec<u8>> {
        self.store().get(&self.path_of(filename))
    }

    /// Document last written as `filename`, decoded by its extension.
    pub fn written(&self, filename: &str) -> Option<Document> {
        let raw = self.uploaded(filename)?;
        let format = Format::from_filename(filename)?;
        format.decode(&raw, &Descriptor::Opaque).ok()
    }

    /// Assert `filename` was written with `expected`.
    ///
    /// Top-level record fields expected as [`ANY`] match whatever was written.
    pub fn assert_file_written(&self, filename: &str, expected: &Document) {
        let actual = self.written(filename);
        assert!(actual.is_some(), "{filename} had no writes");
        let mut actual = actual.unwrap_or_default();
        if let (Document::Object(expected), Document::Object(actual)) = (expected, &mut actual) {
            for (key, value) in actual {
                if expected.get(key).and_then(Document::as_str) == Some(ANY) {
                    *value = Document::from(ANY);
                }
            }
        }
        assert_eq!(&actual, expected, "{filename} content mismatch");
    }

    /// Assert `filename` was uploaded, with exactly `expected` bytes when given.
    pub fn assert_file_uploaded(&self, filename: &str, expected: Option<&[u8]>) {
        let actual = self.uploaded(filename);
        assert!(actual.is_some(), "{filename} had no writes");
        if let (Some(expected), Some(actual)) = (expected, actual) {
            assert_eq!(actual, expected, "{filename} content mismatch");
        }
    }

    /// Assert the installation folder was removed.
    pub fn assert_removed(&self) {
        assert!(self.store().delete_count() > 0, "{MOCK_FOLDER} was never removed");
        assert!(
            !self.store().keys().iter().any(|key| key.starts_with(MOCK_FOLDER)),
            "{MOCK_FOLDER} still has files"
        );
    }
}

impl Default for MockInstallation {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for MockInstallation {
    type Target = Installation<InMemoryObjectStore>;

    fn deref(&self) -> &Self::Target {
        &self.installation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn seeded_files_are_listed_under_the_mock_folder() {
        let installation = MockInstallation::with_files([
            ("config.yml", json!({"version": 2, "name": "x"})),
            ("state.json", json!({"version": 1})),
        ])
        .unwrap();
        assert_eq!(
            installation.files().unwrap(),
            vec!["~/mock/config.yml", "~/mock/state.json"]
        );
        assert_eq!(installation.written("config.yml").unwrap()["name"], "x");
        assert_eq!(installation.product(), "mock");
    }

    #[test]
    fn seeding_an_unknown_extension_is_an_error() {
        let err = MockInstallation::with_files([("notes.txt", json!({"a": 1}))])
            .err()
            .unwrap();
        assert!(matches!(err, InstallationError::UnknownExtension(ext) if ext == "txt"));
    }

    #[test]
    fn wildcard_matches_any_top_level_value() {
        let installation = MockInstallation::new();
        installation
            .upload("version.json", br#"{"version": "v0.1.2", "date": "2024-01-01"}"#)
            .unwrap();
        installation.assert_file_written("version.json", &json!({"version": "v0.1.2", "date": ANY}));
    }

    #[test]
    #[should_panic(expected = "content mismatch")]
    fn mismatch_panics() {
        let installation = MockInstallation::new();
        installation.upload("a.json", br#"{"a": 1}"#).unwrap();
        installation.assert_file_written("a.json", &json!({"a": 2}));
    }

    #[test]
    #[should_panic(expected = "had no writes")]
    fn missing_file_panics() {
        MockInstallation::new().assert_file_uploaded("wheel.whl", None);
    }

    #[test]
    fn uploads_and_removal_are_observable() {
        let installation = MockInstallation::new();
        installation.upload("wheels/x.whl", b"PK").unwrap();
        installation.assert_file_uploaded("wheels/x.whl", Some(&b"PK"[..]));
        installation.remove().unwrap();
        installation.assert_removed();
    }
}
