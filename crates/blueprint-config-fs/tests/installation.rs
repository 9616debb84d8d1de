// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Installation files persisted on disk.

use blueprint_config_fs::FsObjectStore;
use blueprint_installation::Installation;
use blueprint_marshal::{CompositeDescriptor, Descriptor, MarshalError, Record, Typed, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    warehouse: String,
    retries: i64,
}

impl Typed for Settings {
    fn descriptor() -> Descriptor {
        CompositeDescriptor::new("Settings")
            .field::<String>("warehouse")
            .field_with_default("retries", &3_i64)
            .version(1)
            .into()
    }

    fn to_value(&self) -> Value {
        Record::new()
            .with("warehouse", self.warehouse.as_str())
            .with("retries", self.retries)
            .into()
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        let mut record = value.into_record()?;
        Ok(Self {
            warehouse: record.take_field("warehouse")?,
            retries: record.take_field("retries")?,
        })
    }
}

#[test]
fn typed_files_survive_a_new_store_instance() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        warehouse: "main".into(),
        retries: 5,
    };
    {
        let store = FsObjectStore::with_root(dir.path()).unwrap();
        let installation = Installation::assume_global(store, "blueprint");
        assert_eq!(
            installation.save(&settings).unwrap(),
            "/Applications/blueprint/settings.json"
        );
    }

    let raw = std::fs::read_to_string(dir.path().join("Applications/blueprint/settings.json")).unwrap();
    assert_eq!(raw, "{\n  \"version\": 1,\n  \"warehouse\": \"main\",\n  \"retries\": 5\n}");

    let store = FsObjectStore::with_root(dir.path()).unwrap();
    let installation = Installation::current(store, "blueprint", "alice", false).unwrap();
    assert!(installation.is_global());
    assert_eq!(installation.load::<Settings>().unwrap(), settings);
    installation.remove().unwrap();
    assert!(installation.files().unwrap().is_empty());
}
