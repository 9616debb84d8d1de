// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed marshalling between in-memory records and JSON-shaped documents.
#![forbid(unsafe_code)]
//!
//! The engine is driven by [`Descriptor`]s, a closed set of shapes (composite,
//! sequence, mapping, union, enumeration, primitive, opaque, untyped). Rust
//! types opt in through [`Typed`], which supplies the descriptor and converts
//! to and from the dynamic [`Value`] form.
//!
//! - [`Marshaller::marshal`] turns a value into a [`Document`], leaving falsy
//!   composite fields out.
//! - [`Marshaller::unmarshal`] reads a document back, filling absent fields from
//!   declared defaults.
//! - [`Marshaller::load_versioned`] / [`Marshaller::save_versioned`] wrap both
//!   with the schema version marker and forward migrations.
//!
//! Nothing here performs I/O; persistence lives in `blueprint-installation`.

pub mod descriptor;
pub mod error;
pub mod marshal;
pub mod options;
pub mod typed;
mod unmarshal;
pub mod value;
pub mod version;

pub use descriptor::{
    CompositeDescriptor, Container, Descriptor, EnumDescriptor, FieldDescriptor, PrimitiveKind,
};
pub use error::{FieldPath, MarshalError, MISSING};
pub use marshal::{is_falsy, Marshaller};
pub use options::{allow_weak_types, set_allow_weak_types};
pub use typed::Typed;
pub use value::{Document, Record, Value};
pub use version::{migrate, Migration, Versioning, INITIAL_VERSION, VERSION_KEY};
