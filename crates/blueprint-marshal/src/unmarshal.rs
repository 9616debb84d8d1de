// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Document → record direction.

use std::collections::BTreeMap;

use crate::descriptor::{Container, Descriptor, PrimitiveKind};
use crate::error::{describe_document, FieldPath, MarshalError, MISSING};
use crate::marshal::Marshaller;
use crate::value::{Document, Record, Value};

impl Marshaller {
    /// Read `document` as `descriptor`.
    ///
    /// `Ok(None)` means absent: a `null` node, or a union none of whose
    /// alternatives matched. Composite fields that come back absent take their
    /// declared default; without one the call fails with a missing-value error.
    pub fn unmarshal(
        &self,
        document: &Document,
        descriptor: &Descriptor,
    ) -> Result<Option<Value>, MarshalError> {
        self.unmarshal_at(document, descriptor, &FieldPath::root())
    }

    fn unmarshal_at(
        &self,
        document: &Document,
        descriptor: &Descriptor,
        path: &FieldPath,
    ) -> Result<Option<Value>, MarshalError> {
        if document.is_null() {
            return Ok(None);
        }
        let mismatch = || MarshalError::mismatch(path, descriptor, describe_document(document));
        let value = match descriptor {
            Descriptor::Composite(composite) => {
                let Document::Object(entries) = document else {
                    return Err(mismatch());
                };
                let mut record = Record::with_capacity(composite.fields().len());
                for field in composite.fields() {
                    let at = path.join(&field.name);
                    let entry = entries.get(&field.name).unwrap_or(&Document::Null);
                    let value = match self.unmarshal_at(entry, &field.descriptor, &at)? {
                        Some(value) => value,
                        None => field.default.clone().ok_or_else(|| {
                            MarshalError::mismatch(&at, &field.descriptor, MISSING)
                        })?,
                    };
                    record.insert(field.name.clone(), value);
                }
                Value::Record(record)
            }
            Descriptor::Sequence(element) => {
                let Document::Array(items) = document else {
                    return Err(mismatch());
                };
                Value::List(self.unmarshal_items(items, Some(element.as_ref()), path)?)
            }
            Descriptor::Mapping(element) => {
                let Document::Object(entries) = document else {
                    return Err(mismatch());
                };
                Value::Map(self.unmarshal_entries(entries, Some(element.as_ref()), path)?)
            }
            Descriptor::Union(alternatives) => {
                for alternative in alternatives {
                    let branch = path.join(format!("(as {alternative})"));
                    if let Ok(Some(value)) = self.unmarshal_at(document, alternative, &branch) {
                        return Ok(Some(value));
                    }
                }
                return Ok(None);
            }
            Descriptor::Enumeration(enumeration) => match enumeration.name_of(document) {
                Some(name) => Value::Variant(name.to_string()),
                None => return Err(mismatch()),
            },
            Descriptor::Primitive(kind) => {
                unmarshal_primitive(*kind, document).ok_or_else(mismatch)?
            }
            Descriptor::Opaque => Value::from_document(document),
            Descriptor::Untyped(container) => match (container, document) {
                (Container::List, Document::Array(_)) | (Container::Dict, Document::Object(_))
                    if self.allows_weak_types() =>
                {
                    Value::from_document(document)
                }
                (Container::List, Document::Array(items)) => {
                    Value::List(self.unmarshal_items(items, None, path)?)
                }
                (Container::Dict, Document::Object(entries)) => {
                    Value::Map(self.unmarshal_entries(entries, None, path)?)
                }
                _ => return Err(mismatch()),
            },
        };
        Ok(Some(value))
    }

    /// `element: None` infers each element's shape from the document node.
    fn unmarshal_items(
        &self,
        items: &[Document],
        element: Option<&Descriptor>,
        path: &FieldPath,
    ) -> Result<Vec<Value>, MarshalError> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.unmarshal_element(item, element, &path.join(i.to_string())))
            .collect()
    }

    fn unmarshal_entries(
        &self,
        entries: &serde_json::Map<String, Document>,
        element: Option<&Descriptor>,
        path: &FieldPath,
    ) -> Result<BTreeMap<String, Value>, MarshalError> {
        entries
            .iter()
            .map(|(k, item)| {
                let value = self.unmarshal_element(item, element, &path.join(k.as_str()))?;
                Ok((k.clone(), value))
            })
            .collect()
    }

    // Absent elements stay in place as null so lengths are preserved.
    fn unmarshal_element(
        &self,
        item: &Document,
        element: Option<&Descriptor>,
        path: &FieldPath,
    ) -> Result<Value, MarshalError> {
        let inferred;
        let descriptor = match element {
            Some(descriptor) => descriptor,
            None => {
                inferred = Descriptor::infer_document(item);
                &inferred
            }
        };
        Ok(self.unmarshal_at(item, descriptor, path)?.unwrap_or_default())
    }
}

fn unmarshal_primitive(kind: PrimitiveKind, document: &Document) -> Option<Value> {
    match (kind, document) {
        (PrimitiveKind::Int, Document::Number(n)) => n.as_i64().map(Value::Int),
        (PrimitiveKind::Float, Document::Number(n)) => n.as_f64().map(Value::Float),
        (PrimitiveKind::Bool, Document::Bool(b)) => Some(Value::Bool(*b)),
        (PrimitiveKind::Str, Document::String(s)) => Some(Value::Str(s.clone())),
        _ => None,
    }
}
