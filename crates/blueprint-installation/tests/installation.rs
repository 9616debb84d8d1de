// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed load/save through an installation backed by the in-memory store.

use blueprint_dry_tests::{InMemoryObjectStore, MockInstallation};
use blueprint_installation::{Installation, InstallationError, ObjectStore};
use blueprint_marshal::{CompositeDescriptor, Descriptor, Document, MarshalError, Record, Typed, Value};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ToolConfig {
    inventory_database: String,
    include_group_names: Vec<String>,
    num_threads: i64,
}

fn rename_groups(mut document: Document) -> Document {
    if let Some(fields) = document.as_object_mut() {
        if let Some(groups) = fields.remove("groups") {
            fields.insert("include_group_names".into(), groups);
        }
    }
    document["version"] = json!(2);
    document
}

impl Typed for ToolConfig {
    fn descriptor() -> Descriptor {
        CompositeDescriptor::new("ToolConfig")
            .field::<String>("inventory_database")
            .field_with_default("include_group_names", &Vec::<String>::new())
            .field_with_default("num_threads", &10_i64)
            .version(2)
            .migration(1, rename_groups)
            .file("config.yml")
            .into()
    }

    fn to_value(&self) -> Value {
        Record::new()
            .with("inventory_database", self.inventory_database.to_value())
            .with("include_group_names", self.include_group_names.to_value())
            .with("num_threads", self.num_threads.to_value())
            .into()
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        let mut record = value.into_record()?;
        Ok(Self {
            inventory_database: record.take_field("inventory_database")?,
            include_group_names: record.take_field("include_group_names")?,
            num_threads: record.take_field("num_threads")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Policy {
    policy_id: String,
    name: String,
    cores: i64,
    spot: bool,
}

impl Typed for Policy {
    fn descriptor() -> Descriptor {
        CompositeDescriptor::new("Policy")
            .field::<String>("policy_id")
            .field_with_default("name", &String::new())
            .field_with_default("cores", &0_i64)
            .field_with_default("spot", &false)
            .into()
    }

    fn to_value(&self) -> Value {
        Record::new()
            .with("policy_id", self.policy_id.to_value())
            .with("name", self.name.to_value())
            .with("cores", self.cores.to_value())
            .with("spot", self.spot.to_value())
            .into()
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        let mut record = value.into_record()?;
        Ok(Self {
            policy_id: record.take_field("policy_id")?,
            name: record.take_field("name")?,
            cores: record.take_field("cores")?,
            spot: record.take_field("spot")?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct HitCounter {
    hits: i64,
}

impl Typed for HitCounter {
    fn descriptor() -> Descriptor {
        CompositeDescriptor::new("HitCounter")
            .field_with_default("hits", &0_i64)
            .into()
    }

    fn to_value(&self) -> Value {
        Record::new().with("hits", self.hits).into()
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        let mut record = value.into_record()?;
        Ok(Self {
            hits: record.take_field("hits")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Evolved {
    initial: i64,
    added_in_v1: i64,
}

fn seed_added_in_v1(mut document: Document) -> Document {
    document["added_in_v1"] = json!(111);
    document["version"] = json!(2);
    document
}

impl Typed for Evolved {
    fn descriptor() -> Descriptor {
        CompositeDescriptor::new("Evolved")
            .field_with_default("initial", &0_i64)
            .field::<i64>("added_in_v1")
            .version(2)
            .migration(1, seed_added_in_v1)
            .into()
    }

    fn to_value(&self) -> Value {
        Record::new()
            .with("initial", self.initial)
            .with("added_in_v1", self.added_in_v1)
            .into()
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        let mut record = value.into_record()?;
        Ok(Self {
            initial: record.take_field("initial")?,
            added_in_v1: record.take_field("added_in_v1")?,
        })
    }
}

fn config() -> ToolConfig {
    ToolConfig {
        inventory_database: "ucx".into(),
        include_group_names: vec!["admins".into()],
        num_threads: 10,
    }
}

#[test]
fn save_writes_versioned_yaml_under_the_declared_file() {
    let installation = MockInstallation::new();
    let path = installation.save(&config()).unwrap();
    assert_eq!(path, "~/mock/config.yml");
    installation.assert_file_written(
        "config.yml",
        &json!({
            "version": 2,
            "inventory_database": "ucx",
            "include_group_names": ["admins"],
            "num_threads": 10,
        }),
    );
    let back: ToolConfig = installation.load().unwrap();
    assert_eq!(back, config());
}

#[test]
fn old_files_are_migrated_on_load() {
    let installation = MockInstallation::with_files([(
        "config.yml",
        json!({"inventory_database": "ucx", "groups": ["admins"]}),
    )])
    .unwrap();
    let loaded: ToolConfig = installation.load().unwrap();
    assert_eq!(loaded, config());
}

#[test]
fn missing_file_is_not_found_but_defaults_are_available() {
    let installation = MockInstallation::new();
    let err = installation.load::<HitCounter>().unwrap_err();
    assert!(matches!(err, InstallationError::NotFound(path) if path == "~/mock/hit-counter.json"));
    assert_eq!(installation.load_or_default::<HitCounter>().unwrap(), HitCounter::default());
}

#[test]
fn missing_required_field_is_not_replaced_by_defaults() {
    let installation = MockInstallation::new();
    let err = installation.load_or_default::<ToolConfig>().unwrap_err();
    assert!(err.to_string().contains("inventory_database"), "{err}");
}

#[test]
fn corrupt_file_reads_as_empty() {
    let installation =
        MockInstallation::with_raw_files([("hit-counter.json", b"{not json".to_vec())]);
    assert_eq!(installation.load::<HitCounter>().unwrap(), HitCounter::default());
}

#[test]
fn blank_files_read_as_empty_in_every_codec() {
    let installation = MockInstallation::with_raw_files([
        ("hit-counter.json", Vec::new()),
        ("hit-counter.yml", Vec::new()),
        ("whitespace.yml", b"\n  \n".to_vec()),
    ]);
    assert_eq!(installation.load::<HitCounter>().unwrap(), HitCounter::default());
    assert_eq!(
        installation.load_from::<HitCounter>("hit-counter.yml").unwrap(),
        HitCounter::default()
    );
    assert_eq!(
        installation.load_from::<HitCounter>("whitespace.yml").unwrap(),
        HitCounter::default()
    );
}

#[test]
fn null_documents_read_as_empty() {
    let installation = MockInstallation::with_raw_files([
        ("hit-counter.json", b"null".to_vec()),
        ("hit-counter.yml", b"null\n".to_vec()),
        ("policy.yml", b"~\n".to_vec()),
    ]);
    assert_eq!(installation.load::<HitCounter>().unwrap(), HitCounter::default());
    assert_eq!(
        installation.load_from::<HitCounter>("hit-counter.yml").unwrap(),
        HitCounter::default()
    );
    let policies: Vec<Policy> = installation.load_from("policy.yml").unwrap();
    assert!(policies.is_empty());
    let updated = installation.update(|counter: &mut HitCounter| counter.hits += 1).unwrap();
    assert_eq!(updated, HitCounter { hits: 1 });
    installation.assert_file_written("hit-counter.json", &json!({"hits": 1}));
}

#[test]
fn missing_versioned_file_runs_the_whole_migration_chain() {
    let installation = MockInstallation::new();
    let expected = Evolved {
        initial: 0,
        added_in_v1: 111,
    };
    assert_eq!(installation.load_or_default::<Evolved>().unwrap(), expected);

    let blank = MockInstallation::with_raw_files([("evolved.json", Vec::new())]);
    assert_eq!(blank.load::<Evolved>().unwrap(), expected);
}

#[test]
fn unknown_extension_is_rejected() {
    let installation = MockInstallation::new();
    let err = installation.save_as(&config(), "config.txt").unwrap_err();
    assert!(matches!(err, InstallationError::UnknownExtension(ext) if ext == "txt"));
    assert!(installation.store().keys().is_empty());
}

#[test]
fn csv_holds_flat_records() {
    let installation = MockInstallation::new();
    let policies = vec![
        Policy {
            policy_id: "p1".into(),
            name: "small".into(),
            cores: 4,
            spot: false,
        },
        Policy {
            policy_id: "p2".into(),
            name: "spot".into(),
            cores: 0,
            spot: true,
        },
    ];
    installation.save_as(&policies, "policies.csv").unwrap();
    installation.assert_file_uploaded(
        "policies.csv",
        Some(&b"policy_id,name,cores,spot\r\np1,small,4,\r\np2,spot,,true\r\n"[..]),
    );
    let back: Vec<Policy> = installation.load_from("policies.csv").unwrap();
    assert_eq!(back, policies);
}

#[test]
fn list_of_records_uses_the_element_filename() {
    let installation = MockInstallation::new();
    let path = installation
        .save(&vec![Policy {
            policy_id: "p1".into(),
            ..Policy::default()
        }])
        .unwrap();
    assert_eq!(path, "~/mock/policy.json");
    installation.assert_file_written("policy.json", &json!([{"policy_id": "p1"}]));
}

#[test]
fn concurrent_updates_do_not_lose_writes() {
    let installation = MockInstallation::new();
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                installation
                    .update(|counter: &mut HitCounter| counter.hits += 1)
                    .unwrap();
            });
        }
    });
    assert_eq!(installation.load::<HitCounter>().unwrap().hits, 8);
}

#[test]
fn files_and_remove_cover_the_whole_folder() {
    let installation = MockInstallation::new();
    installation.upload("wheels/tool-0.1.0.whl", b"PK").unwrap();
    installation.save(&HitCounter { hits: 1 }).unwrap();
    assert_eq!(
        installation.files().unwrap(),
        vec!["~/mock/hit-counter.json", "~/mock/wheels/tool-0.1.0.whl"]
    );
    installation.remove().unwrap();
    installation.assert_removed();
    assert!(installation.files().unwrap().is_empty());
}

#[test]
fn current_prefers_the_user_home_then_the_global_folder() {
    let store = InMemoryObjectStore::new();
    let err = Installation::current(store.clone(), "blueprint", "alice", false).unwrap_err();
    assert!(matches!(err, InstallationError::NotInstalled(product) if product == "blueprint"));

    let assumed = Installation::current(store.clone(), "blueprint", "alice", true).unwrap();
    assert_eq!(assumed.install_folder(), "/Users/alice/.blueprint");

    store.write("/Applications/blueprint/version.json", b"{}").unwrap();
    let global = Installation::current(store.clone(), "blueprint", "alice", false).unwrap();
    assert!(global.is_global());

    store.write("/Users/alice/.blueprint/config.yml", b"{}").unwrap();
    let home = Installation::current(store, "blueprint", "alice", false).unwrap();
    assert_eq!(home.install_folder(), "/Users/alice/.blueprint");
    assert_eq!(home.username(), "alice");
}

#[test]
fn existing_lists_global_then_user_installations() {
    let store = InMemoryObjectStore::new();
    store.write("/Applications/blueprint/version.json", b"{}").unwrap();
    store.write("/Users/bob/.blueprint/version.json", b"{}").unwrap();
    let found = Installation::existing(&store, "blueprint", ["alice", "bob"]).unwrap();
    let folders: Vec<_> = found.iter().map(Installation::install_folder).collect();
    assert_eq!(folders, vec!["/Applications/blueprint", "/Users/bob/.blueprint"]);
}

#[test]
fn local_files_go_through_the_same_codecs() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("config.yml");
    std::fs::write(&file, "inventory_database: ucx\ngroups:\n  - admins\n").unwrap();

    let installation = MockInstallation::new();
    let loaded: ToolConfig = installation.load_local(&file).unwrap();
    assert_eq!(loaded, config());

    let missing = installation.load_local::<ToolConfig>(&dir.path().join("absent.yml"));
    assert!(matches!(missing, Err(InstallationError::NotFound(_))));
}
