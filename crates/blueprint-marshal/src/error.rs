// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error and path types shared by the marshaller and unmarshaller.

use std::fmt;

use crate::value::{Document, Value};

/// Rendered in place of a value when a document entry or record field is absent.
pub const MISSING: &str = "value is missing";

/// Dotted location of a node, measured from the root of a marshal/unmarshal call.
///
/// Segments are field names, map keys, sequence indices and `(as <alternative>)`
/// markers for union branches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// The empty path (the root of a call).
    pub fn root() -> Self {
        Self::default()
    }

    /// Return a new path with `segment` appended.
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Return a new path with `segment` prepended.
    pub fn under(&self, segment: impl Into<String>) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.push(segment.into());
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    /// Individual path segments, root first.
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// True for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("(root)");
        }
        f.write_str(&self.0.join("."))
    }
}

impl<S: Into<String>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Errors raised while converting between records and documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarshalError {
    /// The value or document node does not have the shape the descriptor expects.
    #[error("{path}: not a {expected}: {actual}")]
    Mismatch {
        /// Location of the offending node.
        path: FieldPath,
        /// Rendered descriptor that was expected.
        expected: String,
        /// Rendered actual value, or [`MISSING`].
        actual: String,
    },
    /// No alternative of a union accepted the value.
    #[error("{path}: union: {}", .reasons.join(" or "))]
    UnionExhausted {
        /// Location of the union node.
        path: FieldPath,
        /// Failure reason of every alternative, in declaration order.
        reasons: Vec<String>,
    },
    /// The value cannot be handled by any descriptor shape.
    #[error("{path}: unknown: {detail}")]
    Unsupported {
        /// Location of the offending node.
        path: FieldPath,
        /// What could not be handled.
        detail: String,
    },
    /// The stored schema version cannot be brought to the declared version.
    #[error("illegal state: {0}")]
    IllegalState(String),
}

impl MarshalError {
    /// Build a [`MarshalError::Mismatch`].
    pub fn mismatch(
        path: &FieldPath,
        expected: impl fmt::Display,
        actual: impl Into<String>,
    ) -> Self {
        Self::Mismatch {
            path: path.clone(),
            expected: expected.to_string(),
            actual: actual.into(),
        }
    }

    /// Location of the failure, when the error carries one.
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            Self::Mismatch { path, .. }
            | Self::UnionExhausted { path, .. }
            | Self::Unsupported { path, .. } => Some(path),
            Self::IllegalState(_) => None,
        }
    }

    /// Re-root the error under `segment`; used when a typed field conversion fails.
    #[must_use]
    pub fn under(self, segment: &str) -> Self {
        match self {
            Self::Mismatch {
                path,
                expected,
                actual,
            } => Self::Mismatch {
                path: path.under(segment),
                expected,
                actual,
            },
            Self::UnionExhausted { path, reasons } => Self::UnionExhausted {
                path: path.under(segment),
                reasons,
            },
            Self::Unsupported { path, detail } => Self::Unsupported {
                path: path.under(segment),
                detail,
            },
            Self::IllegalState(message) => Self::IllegalState(message),
        }
    }
}

/// Render a document node for an error message.
pub(crate) fn describe_document(document: &Document) -> String {
    match document {
        Document::Null => MISSING.to_string(),
        Document::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Render a value for an error message.
pub(crate) fn describe_value(value: &Value) -> String {
    match value {
        Value::Null => MISSING.to_string(),
        other => other.to_string(),
    }
}
