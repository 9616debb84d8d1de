// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed installation files for Blueprint tools.
//!
//! An [`Installation`] is a product-scoped folder in an [`ObjectStore`]. Typed
//! records are marshalled by `blueprint-marshal`, encoded by the filename's
//! [`Format`] (JSON, YAML or CSV) and written under the folder.
//!
//! - [`install_state`] tracks ids of created resources in `state.json`.
//! - [`upgrades`] runs named upgrade steps once each, in version order.
//!
//! Adapters: `blueprint-config-fs` (filesystem) and `blueprint-dry-tests`
//! (in-memory fake).
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod install_state;
pub mod installation;
pub mod store;
mod tabular;
pub mod upgrades;

pub use codec::Format;
pub use error::{CodecError, InstallationError};
pub use install_state::{InstallState, RawState};
pub use installation::{filename_for, kebab_case, Installation};
pub use store::{ObjectStore, StoreError};
pub use upgrades::{AppliedUpgrades, ProductVersion, SemVer, Upgrades};
