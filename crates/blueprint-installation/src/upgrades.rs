// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rolling installed state forward through named upgrade steps.
//!
//! Each step is named `v<semver>_<description>`, e.g. `v0.4.0_add_service`.
//! [`Upgrades::apply`] compares step versions with the installed product
//! version (`version.json`) and the version being installed, runs the steps in
//! between in version order, and records every applied step name in
//! `applied-upgrades.json` so reruns skip it.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use blueprint_marshal::{CompositeDescriptor, Descriptor, MarshalError, Record, Typed, Value};
use tracing::{info, warn};

use crate::error::InstallationError;
use crate::installation::Installation;
use crate::store::ObjectStore;

/// Semantic version, `v` prefix optional. Build metadata is accepted and ignored.
#[derive(Debug, Clone)]
pub struct SemVer {
    /// Major component.
    pub major: u64,
    /// Minor component.
    pub minor: u64,
    /// Patch component.
    pub patch: u64,
    /// Pre-release tag after `-`.
    pub pre_release: Option<String>,
}

impl SemVer {
    /// Build a release version.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
        }
    }
}

impl FromStr for SemVer {
    type Err = InstallationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || InstallationError::InvalidVersion(raw.to_string());
        let text = raw.strip_prefix('v').unwrap_or(raw);
        let text = text.split_once('+').map_or(text, |(core, _)| core);
        let (core, pre_release) = match text.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return Err(invalid()),
            None => (text, None),
        };
        let mut parts = core.split('.');
        let mut next = || -> Result<u64, InstallationError> {
            parts.next().ok_or_else(invalid)?.parse().map_err(|_| invalid())
        };
        let version = Self {
            major: next()?,
            minor: next()?,
            patch: next()?,
            pre_release,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

impl PartialEq for SemVer {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemVer {}

impl PartialOrd for SemVer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A release sorts after every pre-release of the same version.
impl Ord for SemVer {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre_release, &other.pre_release) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

/// Installed product version, kept in `version.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductVersion {
    /// Installed version string.
    pub version: String,
    /// Artifact the version was installed from.
    pub wheel: String,
    /// Install timestamp.
    pub date: String,
}

impl ProductVersion {
    /// Parse [`version`](Self::version).
    pub fn as_semver(&self) -> Result<SemVer, InstallationError> {
        self.version.parse()
    }
}

impl Typed for ProductVersion {
    fn descriptor() -> Descriptor {
        CompositeDescriptor::new("Version")
            .field::<String>("version")
            .field_with_default("wheel", &String::new())
            .field_with_default("date", &String::new())
            .file("version.json")
            .into()
    }

    fn to_value(&self) -> Value {
        Record::new()
            .with("version", self.version.as_str())
            .with("wheel", self.wheel.as_str())
            .with("date", self.date.as_str())
            .into()
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        let mut record = value.into_record()?;
        Ok(Self {
            version: record.take_field("version")?,
            wheel: record.take_field("wheel")?,
            date: record.take_field("date")?,
        })
    }
}

/// Names of upgrade steps already applied, kept in `applied-upgrades.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedUpgrades {
    /// Applied step names, in application order.
    pub upgrades: Vec<String>,
}

impl Typed for AppliedUpgrades {
    fn descriptor() -> Descriptor {
        CompositeDescriptor::new("AppliedUpgrades")
            .field_with_default("upgrades", &Vec::<String>::new())
            .version(1)
            .file("applied-upgrades.json")
            .into()
    }

    fn to_value(&self) -> Value {
        Record::new()
            .with("upgrades", self.upgrades.to_value())
            .into()
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        let mut record = value.into_record()?;
        Ok(Self {
            upgrades: record.take_field("upgrades")?,
        })
    }
}

type Step<S> = Box<dyn Fn(&Installation<S>) -> Result<(), InstallationError> + Send + Sync>;

struct Upgrade<S> {
    name: String,
    step: Step<S>,
}

/// Ordered registry of upgrade steps for one installation.
pub struct Upgrades<'a, S> {
    installation: &'a Installation<S>,
    product_version: SemVer,
    steps: Vec<Upgrade<S>>,
}

impl<'a, S: ObjectStore> Upgrades<'a, S> {
    /// Upgrades of `installation` towards `product_version`, the version being installed.
    pub fn new(installation: &'a Installation<S>, product_version: SemVer) -> Self {
        Self {
            installation,
            product_version,
            steps: Vec::new(),
        }
    }

    /// Register a step named `v<semver>_<description>`.
    pub fn register<F>(mut self, name: impl Into<String>, step: F) -> Self
    where
        F: Fn(&Installation<S>) -> Result<(), InstallationError> + Send + Sync + 'static,
    {
        self.steps.push(Upgrade {
            name: name.into(),
            step: Box::new(step),
        });
        self
    }

    /// Run pending steps and return the names applied by this call.
    ///
    /// Steps older than the installed version are skipped silently, steps newer
    /// than the product version and unparseable names with a warning. The
    /// applied list is saved after each step, so a failing step leaves earlier
    /// ones recorded.
    pub fn apply(&self) -> Result<Vec<String>, InstallationError> {
        if self.steps.is_empty() {
            warn!(product = %self.installation.product(), "no upgrades registered");
            return Ok(Vec::new());
        }
        let installed = self.installation.load::<ProductVersion>()?.as_semver()?;
        let mut applied = self.installation.load_or_default::<AppliedUpgrades>()?;
        let mut ran = Vec::new();
        for upgrade in self.pending(&installed) {
            if applied.upgrades.contains(&upgrade.name) {
                info!(step = %upgrade.name, "already applied");
                continue;
            }
            info!(step = %upgrade.name, "applying upgrade");
            (upgrade.step)(self.installation)?;
            applied.upgrades.push(upgrade.name.clone());
            self.installation.save(&applied)?;
            ran.push(upgrade.name.clone());
        }
        Ok(ran)
    }

    fn pending(&self, installed: &SemVer) -> Vec<&Upgrade<S>> {
        let mut pending: Vec<(SemVer, &Upgrade<S>)> = Vec::new();
        for upgrade in &self.steps {
            let Some(version) = step_version(&upgrade.name) else {
                warn!(step = %upgrade.name, "not an upgrade step");
                continue;
            };
            if version < *installed {
                continue;
            }
            if version > self.product_version {
                warn!(step = %upgrade.name, "future version");
                continue;
            }
            pending.push((version, upgrade));
        }
        pending.sort_by(|(a, _), (b, _)| a.cmp(b));
        pending.into_iter().map(|(_, upgrade)| upgrade).collect()
    }
}

/// Version prefix of a step name, or `None` when the name is not `v<semver>_<description>`.
pub fn step_version(name: &str) -> Option<SemVer> {
    let (version, description) = name.split_once('_')?;
    if description.is_empty() {
        return None;
    }
    version.parse().ok()
}
