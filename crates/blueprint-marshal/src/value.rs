// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dynamic in-memory values and the wire-level document type.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{FieldPath, MarshalError};

/// Wire-level document: null, bool, number, string, list or string-keyed map.
///
/// Object key order is preserved, so marshalled records keep declaration order.
pub type Document = serde_json::Value;

/// Dynamic form of a typed record, as seen by the marshaller.
///
/// Typed structs convert to and from `Value` through [`Typed`](crate::Typed);
/// descriptors decide how each variant maps onto a [`Document`].
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absent / explicit null.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered list.
    List(Vec<Value>),
    /// String-keyed map.
    Map(BTreeMap<String, Value>),
    /// Record with named fields in declaration order.
    Record(Record),
    /// Enumeration constant, by name.
    Variant(String),
}

impl Value {
    /// True for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Build a value from a document node, inferring each variant from the node kind.
    ///
    /// Integers that fit in `i64` become [`Value::Int`]; every other number becomes
    /// [`Value::Float`].
    pub fn from_document(document: &Document) -> Self {
        match document {
            Document::Null => Self::Null,
            Document::Bool(b) => Self::Bool(*b),
            Document::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Document::String(s) => Self::Str(s.clone()),
            Document::Array(items) => Self::List(items.iter().map(Self::from_document).collect()),
            Document::Object(entries) => Self::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_document(v)))
                    .collect(),
            ),
        }
    }

    /// Convert wholesale into a document, without a descriptor.
    ///
    /// Records become objects holding every field; enum variants and non-finite
    /// floats cannot be represented and fail.
    pub fn to_document(&self) -> Result<Document, MarshalError> {
        self.to_document_at(&FieldPath::root())
    }

    pub(crate) fn to_document_at(&self, path: &FieldPath) -> Result<Document, MarshalError> {
        Ok(match self {
            Self::Null => Document::Null,
            Self::Bool(b) => Document::Bool(*b),
            Self::Int(i) => Document::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(Document::Number)
                .ok_or_else(|| MarshalError::mismatch(path, "float", f.to_string()))?,
            Self::Str(s) => Document::String(s.clone()),
            Self::List(items) => Document::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| item.to_document_at(&path.join(i.to_string())))
                    .collect::<Result<_, _>>()?,
            ),
            Self::Map(entries) => Document::Object(
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_document_at(&path.join(k.as_str()))?)))
                    .collect::<Result<_, MarshalError>>()?,
            ),
            Self::Record(record) => Document::Object(
                record
                    .iter()
                    .map(|(k, v)| Ok((k.to_string(), v.to_document_at(&path.join(k))?)))
                    .collect::<Result<_, MarshalError>>()?,
            ),
            Self::Variant(name) => {
                return Err(MarshalError::Unsupported {
                    path: path.clone(),
                    detail: format!("enum constant {name} has no descriptor"),
                })
            }
        })
    }

    /// Unwrap a record, failing with a mismatch otherwise.
    pub fn into_record(self) -> Result<Record, MarshalError> {
        match self {
            Self::Record(record) => Ok(record),
            other => Err(MarshalError::mismatch(
                &FieldPath::root(),
                "record",
                crate::error::describe_value(&other),
            )),
        }
    }

    /// Unwrap an enumeration constant name, failing with a mismatch otherwise.
    pub fn into_variant(self) -> Result<String, MarshalError> {
        match self {
            Self::Variant(name) => Ok(name),
            other => Err(MarshalError::mismatch(
                &FieldPath::root(),
                "enum",
                crate::error::describe_value(&other),
            )),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) | Self::Variant(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => write_entries(f, entries.iter().map(|(k, v)| (k.as_str(), v))),
            Self::Record(record) => write_entries(f, record.iter()),
        }
    }
}

fn write_entries<'a>(
    f: &mut fmt::Formatter<'_>,
    entries: impl Iterator<Item = (&'a str, &'a Value)>,
) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in entries.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{k}: {v}")?;
    }
    f.write_str("}")
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

/// Named fields of a record, kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty record with room for `capacity` fields.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Builder form of [`Record::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing an existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Remove and return a field.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(idx).1)
    }

    /// Remove a field and convert it into `T`; an absent field converts from [`Value::Null`].
    ///
    /// Conversion errors are re-rooted under the field name.
    pub fn take_field<T: crate::Typed>(&mut self, name: &str) -> Result<T, MarshalError> {
        let value = self.take(name).unwrap_or_default();
        T::from_value(value).map_err(|err| err.under(name))
    }

    /// Iterate fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_document_keeps_integers_and_floats_apart() {
        let value = Value::from_document(&json!({"a": 1, "b": 1.5, "c": [true, null]}));
        let Value::Map(entries) = value else {
            panic!("expected a map");
        };
        assert_eq!(entries["a"], Value::Int(1));
        assert_eq!(entries["b"], Value::Float(1.5));
        assert_eq!(
            entries["c"],
            Value::List(vec![Value::Bool(true), Value::Null])
        );
    }

    #[test]
    fn record_to_document_keeps_declaration_order() {
        let record = Record::new().with("zeta", 1).with("alpha", "x");
        let document = Value::Record(record).to_document().unwrap();
        let keys: Vec<_> = document.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn non_finite_floats_and_variants_do_not_convert() {
        let err = Value::List(vec![Value::Float(f64::NAN)])
            .to_document()
            .unwrap_err();
        assert_eq!(err.path().unwrap().to_string(), "0");

        let err = Value::Variant("Red".into()).to_document().unwrap_err();
        assert!(matches!(err, MarshalError::Unsupported { .. }));
    }

    #[test]
    fn record_insert_replaces_in_place() {
        let mut record = Record::new().with("a", 1).with("b", 2);
        record.insert("a", 3);
        assert_eq!(record.get("a"), Some(&Value::Int(3)));
        assert_eq!(record.iter().next().map(|(k, _)| k), Some("a"));
        assert_eq!(record.take("b"), Some(Value::Int(2)));
        assert_eq!(record.len(), 1);
    }
}
