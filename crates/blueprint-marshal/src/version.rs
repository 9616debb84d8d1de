// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema versions and forward migration of stored documents.
//!
//! A versioned composite stores its version under [`VERSION_KEY`]. Loading
//! removes the marker, then applies registered migrations one version at a
//! time until the declared version is reached. Each migration must stamp the
//! next version itself; a migration that does not move the marker forward, or
//! a gap with no registered migration, is an illegal state.

use std::collections::BTreeMap;

use tracing::debug;

use crate::descriptor::Descriptor;
use crate::error::{describe_document, FieldPath, MarshalError};
use crate::marshal::Marshaller;
use crate::value::{Document, Value};

/// Reserved document key holding the schema version.
pub const VERSION_KEY: &str = "version";

/// Version assumed for documents without a marker.
pub const INITIAL_VERSION: u32 = 1;

/// Lifts a document from version `N` to `N + 1` and stamps [`VERSION_KEY`].
pub type Migration = fn(Document) -> Document;

/// Declared schema version plus the migrations leading to it.
#[derive(Debug, Clone)]
pub struct Versioning {
    version: u32,
    migrations: BTreeMap<u32, Migration>,
}

impl Versioning {
    /// Target version `version` with no migrations.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            migrations: BTreeMap::new(),
        }
    }

    /// Register the migration from `from` to `from + 1`.
    #[must_use]
    pub fn with_migration(mut self, from: u32, migration: Migration) -> Self {
        self.migrations.insert(from, migration);
        self
    }

    pub(crate) fn retarget(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Declared version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Migration registered for source version `from`.
    pub fn migration(&self, from: u32) -> Option<Migration> {
        self.migrations.get(&from).copied()
    }
}

/// Bring `document` to the declared version. `source` names the document in errors.
pub fn migrate(
    versioning: &Versioning,
    document: Document,
    source: &str,
) -> Result<Document, MarshalError> {
    let target = versioning.version();
    let mut fields = match document {
        Document::Object(fields) => fields,
        other => {
            return Err(MarshalError::mismatch(
                &FieldPath::root(),
                "dict",
                describe_document(&other),
            ))
        }
    };
    let mut current = take_version(&mut fields)?;
    while current < target {
        let Some(step) = versioning.migration(current) else {
            break;
        };
        debug!(source, from = current, to = target, "migrating document");
        fields = match step(Document::Object(fields)) {
            Document::Object(fields) => fields,
            other => {
                return Err(MarshalError::IllegalState(format!(
                    "migration of {source} from v{current} produced {}",
                    describe_document(&other)
                )))
            }
        };
        let next = take_version(&mut fields)?;
        if next <= current {
            return Err(MarshalError::IllegalState(format!(
                "cannot migrate {source} from v{current}"
            )));
        }
        current = next;
    }
    if current != target {
        return Err(MarshalError::IllegalState(format!(
            "expected state version={target}, got={current}"
        )));
    }
    Ok(Document::Object(fields))
}

fn take_version(fields: &mut serde_json::Map<String, Document>) -> Result<u32, MarshalError> {
    match fields.remove(VERSION_KEY) {
        None => Ok(INITIAL_VERSION),
        Some(Document::Number(n)) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                MarshalError::mismatch(&FieldPath::root().join(VERSION_KEY), "int", n.to_string())
            }),
        Some(other) => Err(MarshalError::mismatch(
            &FieldPath::root().join(VERSION_KEY),
            "int",
            describe_document(&other),
        )),
    }
}

impl Marshaller {
    /// Migrate `document` when `descriptor` is a versioned composite, then unmarshal it.
    pub fn load_versioned(
        &self,
        descriptor: &Descriptor,
        document: Document,
        source: &str,
    ) -> Result<Option<Value>, MarshalError> {
        let document = match descriptor.versioning() {
            Some(versioning) => migrate(versioning, document, source)?,
            None => document,
        };
        self.unmarshal(&document, descriptor)
    }

    /// Marshal `value` and stamp the declared version first in the document.
    pub fn save_versioned(
        &self,
        descriptor: &Descriptor,
        value: &Value,
    ) -> Result<Document, MarshalError> {
        let document = self.marshal(descriptor, value)?;
        match (descriptor.versioning(), document) {
            (Some(versioning), Document::Object(fields)) => {
                let mut stamped = serde_json::Map::with_capacity(fields.len() + 1);
                stamped.insert(VERSION_KEY.to_string(), Document::from(versioning.version()));
                stamped.extend(fields);
                Ok(Document::Object(stamped))
            }
            (_, document) => Ok(document),
        }
    }
}
