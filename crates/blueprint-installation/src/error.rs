// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error types for codecs and installations.

use blueprint_marshal::MarshalError;
use thiserror::Error;

use crate::store::StoreError;

/// Encoding or decoding failure.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed JSON, or a document that cannot be written as JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// Malformed YAML, or a document that cannot be written as YAML.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// Malformed CSV.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// The document does not fit the format (CSV needs a flat list of records).
    #[error("{0}")]
    Shape(String),
}

/// Error type for installation operations.
#[derive(Debug, Error)]
pub enum InstallationError {
    /// Neither the user home nor the global folder holds the product.
    #[error("application not installed: {0}")]
    NotInstalled(String),
    /// The requested file does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The filename extension selects no codec.
    #[error("unknown extension: {0}")]
    UnknownExtension(String),
    /// No filename given and none can be inferred from the type.
    #[error("cannot infer a filename for {0}")]
    MissingFilename(String),
    /// An upgrade step or installed version does not carry a valid semantic version.
    #[error("invalid version: {0}")]
    InvalidVersion(String),
    /// Record/document conversion failed.
    #[error(transparent)]
    Marshal(#[from] MarshalError),
    /// Underlying store failed.
    #[error(transparent)]
    Store(StoreError),
    /// Encoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Missing keys surface as [`InstallationError::NotFound`] so callers match one variant.
impl From<StoreError> for InstallationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => Self::NotFound(key),
            other => Self::Store(other),
        }
    }
}
