// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record → document direction.
//!
//! Composite fields are sparse: a field whose marshalled form is falsy
//! (null, `false`, zero, empty string, empty list or map) is left out of the
//! document. Readers restore such fields from their declared defaults.

use crate::descriptor::{Container, Descriptor, PrimitiveKind};
use crate::error::{describe_value, FieldPath, MarshalError};
use crate::options;
use crate::typed::Typed;
use crate::value::{Document, Value};

/// Descriptor-driven converter between [`Value`]s and [`Document`]s.
///
/// The only state is the weak typing flag, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marshaller {
    allow_weak_types: bool,
}

impl Default for Marshaller {
    fn default() -> Self {
        Self::new()
    }
}

impl Marshaller {
    /// Marshaller using the process-wide weak typing default.
    pub fn new() -> Self {
        Self::with_weak_types(options::allow_weak_types())
    }

    /// Marshaller with an explicit weak typing flag.
    pub fn with_weak_types(allow_weak_types: bool) -> Self {
        Self { allow_weak_types }
    }

    /// Whether untyped containers pass through without element validation.
    pub fn allows_weak_types(&self) -> bool {
        self.allow_weak_types
    }

    /// Convert `value` into a document shaped by `descriptor`.
    pub fn marshal(&self, descriptor: &Descriptor, value: &Value) -> Result<Document, MarshalError> {
        self.marshal_at(descriptor, value, &FieldPath::root())
    }

    /// Marshal a typed value, stamping its schema version when it declares one.
    pub fn to_document<T: Typed>(&self, value: &T) -> Result<Document, MarshalError> {
        self.save_versioned(&T::descriptor(), &value.to_value())
    }

    /// Migrate and unmarshal a document into `T`. `source` names the document in errors.
    ///
    /// An absent result (a `null` document) converts from [`Value::Null`].
    pub fn from_document<T: Typed>(&self, document: Document, source: &str) -> Result<T, MarshalError> {
        let value = self.load_versioned(&T::descriptor(), document, source)?;
        T::from_value(value.unwrap_or_default())
    }

    fn marshal_at(
        &self,
        descriptor: &Descriptor,
        value: &Value,
        path: &FieldPath,
    ) -> Result<Document, MarshalError> {
        if value.is_null() {
            return Ok(Document::Null);
        }
        match descriptor {
            Descriptor::Composite(composite) => {
                let Value::Record(record) = value else {
                    return Err(MarshalError::mismatch(path, descriptor, describe_value(value)));
                };
                let mut fields = serde_json::Map::with_capacity(composite.fields().len());
                for field in composite.fields() {
                    let Some(raw) = record.get(&field.name).filter(|v| !v.is_null()) else {
                        continue;
                    };
                    let document = self.marshal_at(&field.descriptor, raw, &path.join(&field.name))?;
                    if !is_falsy(&document) {
                        fields.insert(field.name.clone(), document);
                    }
                }
                Ok(Document::Object(fields))
            }
            Descriptor::Sequence(element) => {
                let Value::List(items) = value else {
                    return Err(MarshalError::mismatch(path, descriptor, describe_value(value)));
                };
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.marshal_at(element, item, &path.join(i.to_string())))
                    .collect::<Result<_, _>>()
                    .map(Document::Array)
            }
            Descriptor::Mapping(element) => {
                let Value::Map(entries) = value else {
                    return Err(MarshalError::mismatch(path, descriptor, describe_value(value)));
                };
                entries
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), self.marshal_at(element, v, &path.join(k.as_str()))?)))
                    .collect::<Result<_, MarshalError>>()
                    .map(Document::Object)
            }
            Descriptor::Union(alternatives) => {
                let mut reasons = Vec::with_capacity(alternatives.len());
                for alternative in alternatives {
                    let branch = path.join(format!("(as {alternative})"));
                    match self.marshal_at(alternative, value, &branch) {
                        Ok(document) => return Ok(document),
                        Err(err) => reasons.push(err.to_string()),
                    }
                }
                Err(MarshalError::UnionExhausted {
                    path: path.clone(),
                    reasons,
                })
            }
            Descriptor::Enumeration(enumeration) => match value {
                Value::Variant(name) => enumeration
                    .value_of(name)
                    .cloned()
                    .ok_or_else(|| MarshalError::mismatch(path, descriptor, name.clone())),
                other => Err(MarshalError::mismatch(path, descriptor, describe_value(other))),
            },
            Descriptor::Primitive(kind) => marshal_primitive(*kind, value, path),
            Descriptor::Opaque => value.to_document_at(path),
            Descriptor::Untyped(container) => self.marshal_untyped(*container, value, path),
        }
    }

    fn marshal_untyped(
        &self,
        container: Container,
        value: &Value,
        path: &FieldPath,
    ) -> Result<Document, MarshalError> {
        let descriptor = Descriptor::Untyped(container);
        match (container, value) {
            (Container::List, Value::List(items)) if !self.allow_weak_types => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.marshal_inferred(item, &path.join(i.to_string())))
                .collect::<Result<_, _>>()
                .map(Document::Array),
            (Container::Dict, Value::Map(entries)) if !self.allow_weak_types => entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.marshal_inferred(v, &path.join(k.as_str()))?)))
                .collect::<Result<_, MarshalError>>()
                .map(Document::Object),
            (Container::List, Value::List(_)) | (Container::Dict, Value::Map(_)) => {
                value.to_document_at(path)
            }
            _ => Err(MarshalError::mismatch(path, descriptor, describe_value(value))),
        }
    }

    fn marshal_inferred(&self, value: &Value, path: &FieldPath) -> Result<Document, MarshalError> {
        let descriptor = Descriptor::infer(value).ok_or_else(|| MarshalError::Unsupported {
            path: path.clone(),
            detail: format!("untyped container holds {value}"),
        })?;
        self.marshal_at(&descriptor, value, path)
    }
}

#[allow(clippy::cast_precision_loss)]
fn marshal_primitive(
    kind: PrimitiveKind,
    value: &Value,
    path: &FieldPath,
) -> Result<Document, MarshalError> {
    let mismatch = || MarshalError::mismatch(path, kind, describe_value(value));
    match (kind, value) {
        (PrimitiveKind::Int, Value::Int(i)) => Ok(Document::from(*i)),
        (PrimitiveKind::Float, Value::Int(i)) => float(*i as f64).ok_or_else(mismatch),
        (PrimitiveKind::Float, Value::Float(f)) => float(*f).ok_or_else(mismatch),
        (PrimitiveKind::Bool, Value::Bool(b)) => Ok(Document::Bool(*b)),
        (PrimitiveKind::Str, Value::Str(s)) => Ok(Document::String(s.clone())),
        _ => Err(mismatch()),
    }
}

fn float(f: f64) -> Option<Document> {
    serde_json::Number::from_f64(f).map(Document::Number)
}

/// True for documents the sparse encoding leaves out of a composite.
pub fn is_falsy(document: &Document) -> bool {
    match document {
        Document::Null => true,
        Document::Bool(b) => !b,
        Document::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Document::String(s) => s.is_empty(),
        Document::Array(items) => items.is_empty(),
        Document::Object(entries) => entries.is_empty(),
    }
}
