// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `state.json`: ids of remote resources created by an installation.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use blueprint_marshal::{CompositeDescriptor, Descriptor, MarshalError, Record, Typed, Value};

use crate::error::InstallationError;
use crate::installation::Installation;
use crate::store::ObjectStore;

/// Resource ids grouped by kind, then by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawState {
    /// `kind → name → id`.
    pub resources: BTreeMap<String, BTreeMap<String, String>>,
}

impl Typed for RawState {
    fn descriptor() -> Descriptor {
        CompositeDescriptor::new("RawState")
            .field_with_default("resources", &BTreeMap::<String, BTreeMap<String, String>>::new())
            .version(1)
            .file("state.json")
            .into()
    }

    fn to_value(&self) -> Value {
        Record::new()
            .with("resources", self.resources.to_value())
            .into()
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        let mut record = value.into_record()?;
        Ok(Self {
            resources: record.take_field("resources")?,
        })
    }
}

/// Lazily loaded view of an installation's `state.json`.
///
/// The file is read on first access (a missing file is an empty state) and
/// kept in memory until [`save`](Self::save).
pub struct InstallState<'a, S> {
    installation: &'a Installation<S>,
    state: Mutex<Option<RawState>>,
}

impl<'a, S: ObjectStore> InstallState<'a, S> {
    /// State tracked inside `installation`.
    pub fn new(installation: &'a Installation<S>) -> Self {
        Self {
            installation,
            state: Mutex::new(None),
        }
    }

    /// Folder of the backing installation.
    pub fn install_folder(&self) -> &str {
        self.installation.install_folder()
    }

    /// Resources of `kind`, by name.
    pub fn resources(&self, kind: &str) -> Result<BTreeMap<String, String>, InstallationError> {
        let state = self.loaded()?;
        Ok(state
            .as_ref()
            .and_then(|state| state.resources.get(kind))
            .cloned()
            .unwrap_or_default())
    }

    /// Id of resource `name` of `kind`.
    pub fn get(&self, kind: &str, name: &str) -> Result<Option<String>, InstallationError> {
        Ok(self.resources(kind)?.remove(name))
    }

    /// Record the id of resource `name` of `kind`. Not persisted until [`save`](Self::save).
    pub fn set(
        &self,
        kind: &str,
        name: impl Into<String>,
        id: impl Into<String>,
    ) -> Result<(), InstallationError> {
        let mut state = self.loaded()?;
        state
            .get_or_insert_with(RawState::default)
            .resources
            .entry(kind.to_string())
            .or_default()
            .insert(name.into(), id.into());
        Ok(())
    }

    /// Persist the in-memory state and return the full path of `state.json`.
    pub fn save(&self) -> Result<String, InstallationError> {
        let state = self.loaded()?;
        let empty = RawState::default();
        self.installation.save(state.as_ref().unwrap_or(&empty))
    }

    fn loaded(&self) -> Result<MutexGuard<'_, Option<RawState>>, InstallationError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.is_none() {
            *state = Some(match self.installation.load::<RawState>() {
                Ok(loaded) => loaded,
                Err(InstallationError::NotFound(_)) => RawState::default(),
                Err(err) => return Err(err),
            });
        }
        Ok(state)
    }
}
