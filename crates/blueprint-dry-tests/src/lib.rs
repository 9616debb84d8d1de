// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Blueprint crates.
//!
//! # Modules
//!
//! - [`store`] - In-memory object store fake for testing without filesystem
//! - [`installation`] - Mock installation with file write assertions
#![forbid(unsafe_code)]

pub mod installation;
pub mod store;

// Re-export commonly used items at crate root for convenience
pub use installation::{MockInstallation, ANY, MOCK_FOLDER, MOCK_PRODUCT};
pub use store::InMemoryObjectStore;
