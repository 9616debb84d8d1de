// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Structural descriptions of target types.
//!
//! A [`Descriptor`] is a closed set of shapes the marshaller dispatches on. Typed
//! structs build theirs through [`Typed::descriptor`](crate::Typed::descriptor);
//! descriptors are cheap to rebuild and are never cached between calls.

use std::fmt;

use crate::typed::Typed;
use crate::value::{Document, Value};
use crate::version::{Migration, Versioning};

/// Primitive leaf kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Signed integer.
    Int,
    /// Floating point number (integers are accepted on read).
    Float,
    /// Boolean.
    Bool,
    /// String.
    Str,
    /// Explicit absence.
    Null,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Null => "none",
        })
    }
}

/// Container kind of an untyped (weakly typed) collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// A list with no declared element type.
    List,
    /// A string-keyed map with no declared value type.
    Dict,
}

/// Shape of a target type.
#[derive(Debug, Clone)]
pub enum Descriptor {
    /// Named fields, optionally versioned.
    Composite(CompositeDescriptor),
    /// Ordered list of elements.
    Sequence(Box<Descriptor>),
    /// String-keyed map of values.
    Mapping(Box<Descriptor>),
    /// Ordered alternatives; the first structural match wins.
    Union(Vec<Descriptor>),
    /// Named constants with primitive values.
    Enumeration(EnumDescriptor),
    /// Primitive leaf.
    Primitive(PrimitiveKind),
    /// Passthrough without validation.
    Opaque,
    /// Collection without a declared element type; see the weak typing toggle.
    Untyped(Container),
}

impl Descriptor {
    /// `list[element]`.
    pub fn sequence(element: Descriptor) -> Self {
        Self::Sequence(Box::new(element))
    }

    /// `dict[str, value]`.
    pub fn mapping(value: Descriptor) -> Self {
        Self::Mapping(Box::new(value))
    }

    /// `inner | none`.
    pub fn optional(inner: Descriptor) -> Self {
        Self::Union(vec![inner, Self::Primitive(PrimitiveKind::Null)])
    }

    /// The composite shape, if this is one.
    pub fn as_composite(&self) -> Option<&CompositeDescriptor> {
        match self {
            Self::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    /// Versioning of a composite descriptor.
    pub fn versioning(&self) -> Option<&Versioning> {
        self.as_composite().and_then(CompositeDescriptor::versioning)
    }

    /// Descriptor matching the runtime kind of `value`.
    ///
    /// Records and enum constants carry no self-description and yield `None`.
    pub fn infer(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => Self::Primitive(PrimitiveKind::Null),
            Value::Bool(_) => Self::Primitive(PrimitiveKind::Bool),
            Value::Int(_) => Self::Primitive(PrimitiveKind::Int),
            Value::Float(_) => Self::Primitive(PrimitiveKind::Float),
            Value::Str(_) => Self::Primitive(PrimitiveKind::Str),
            Value::List(_) => Self::Untyped(Container::List),
            Value::Map(_) => Self::Untyped(Container::Dict),
            Value::Record(_) | Value::Variant(_) => return None,
        })
    }

    /// Descriptor matching the kind of a document node.
    pub fn infer_document(document: &Document) -> Self {
        match document {
            Document::Null => Self::Primitive(PrimitiveKind::Null),
            Document::Bool(_) => Self::Primitive(PrimitiveKind::Bool),
            Document::Number(n) if n.is_i64() => Self::Primitive(PrimitiveKind::Int),
            Document::Number(_) => Self::Primitive(PrimitiveKind::Float),
            Document::String(_) => Self::Primitive(PrimitiveKind::Str),
            Document::Array(_) => Self::Untyped(Container::List),
            Document::Object(_) => Self::Untyped(Container::Dict),
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Composite(composite) => f.write_str(composite.name()),
            Self::Sequence(element) => write!(f, "list[{element}]"),
            Self::Mapping(value) => write!(f, "dict[str, {value}]"),
            Self::Union(alternatives) => {
                for (i, alternative) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{alternative}")?;
                }
                Ok(())
            }
            Self::Enumeration(enumeration) => f.write_str(enumeration.name()),
            Self::Primitive(kind) => write!(f, "{kind}"),
            Self::Opaque => f.write_str("any"),
            Self::Untyped(Container::List) => f.write_str("list"),
            Self::Untyped(Container::Dict) => f.write_str("dict"),
        }
    }
}

impl From<CompositeDescriptor> for Descriptor {
    fn from(value: CompositeDescriptor) -> Self {
        Self::Composite(value)
    }
}

impl From<EnumDescriptor> for Descriptor {
    fn from(value: EnumDescriptor) -> Self {
        Self::Enumeration(value)
    }
}

/// One declared field of a composite.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name, also the document key.
    pub name: String,
    /// Shape of the field value.
    pub descriptor: Descriptor,
    /// Value substituted when the document has no usable entry.
    pub default: Option<Value>,
}

/// Record type with named fields.
#[derive(Debug, Clone)]
pub struct CompositeDescriptor {
    name: String,
    fields: Vec<FieldDescriptor>,
    versioning: Option<Versioning>,
    file: Option<String>,
}

impl CompositeDescriptor {
    /// Start describing a record type called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            versioning: None,
            file: None,
        }
    }

    /// Declare a required field of type `T`.
    #[must_use]
    pub fn field<T: Typed>(self, name: impl Into<String>) -> Self {
        self.field_descriptor(name, T::descriptor(), None)
    }

    /// Declare a field of type `T` with a default.
    #[must_use]
    pub fn field_with_default<T: Typed>(self, name: impl Into<String>, default: &T) -> Self {
        self.field_descriptor(name, T::descriptor(), Some(default.to_value()))
    }

    /// Declare an `Option<T>` field that defaults to absent.
    #[must_use]
    pub fn optional_field<T: Typed>(self, name: impl Into<String>) -> Self {
        self.field_descriptor(name, Descriptor::optional(T::descriptor()), Some(Value::Null))
    }

    /// Declare a field from an explicit descriptor.
    #[must_use]
    pub fn field_descriptor(
        mut self,
        name: impl Into<String>,
        descriptor: Descriptor,
        default: Option<Value>,
    ) -> Self {
        self.fields.push(FieldDescriptor {
            name: name.into(),
            descriptor,
            default,
        });
        self
    }

    /// Declare the schema version documents are migrated to.
    #[must_use]
    pub fn version(mut self, version: u32) -> Self {
        let migrations = self.versioning.take();
        self.versioning = Some(match migrations {
            Some(existing) => existing.retarget(version),
            None => Versioning::new(version),
        });
        self
    }

    /// Register the migration that lifts documents from version `from` to `from + 1`.
    ///
    /// Declares version 1 when no version has been declared yet.
    #[must_use]
    pub fn migration(mut self, from: u32, migration: Migration) -> Self {
        let versioning = self.versioning.take().unwrap_or_else(|| Versioning::new(1));
        self.versioning = Some(versioning.with_migration(from, migration));
        self
    }

    /// Preferred file name for persisting this record.
    #[must_use]
    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared fields, in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a declared field.
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Schema version and migrations, when declared.
    pub fn versioning(&self) -> Option<&Versioning> {
        self.versioning.as_ref()
    }

    /// Declared file name, if any.
    pub fn declared_file(&self) -> Option<&str> {
        self.file.as_deref()
    }
}

/// Named constants with primitive values.
#[derive(Debug, Clone)]
pub struct EnumDescriptor {
    name: String,
    constants: Vec<(String, Document)>,
}

impl EnumDescriptor {
    /// Start describing an enumeration called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constants: Vec::new(),
        }
    }

    /// Declare a constant and the primitive value stored for it.
    #[must_use]
    pub fn constant(mut self, name: impl Into<String>, value: impl Into<Document>) -> Self {
        self.constants.push((name.into(), value.into()));
        self
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared constants and their stored values, in declaration order.
    pub fn constants(&self) -> impl Iterator<Item = (&str, &Document)> {
        self.constants.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Stored value of the constant called `name`.
    pub fn value_of(&self, name: &str) -> Option<&Document> {
        self.constants
            .iter()
            .find(|(constant, _)| constant == name)
            .map(|(_, value)| value)
    }

    /// Constant whose stored value equals `value`.
    pub fn name_of(&self, value: &Document) -> Option<&str> {
        self.constants
            .iter()
            .find(|(_, stored)| stored == value)
            .map(|(constant, _)| constant.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_nested_shapes() {
        let descriptor = Descriptor::mapping(Descriptor::optional(Descriptor::sequence(
            Descriptor::Primitive(PrimitiveKind::Int),
        )));
        assert_eq!(descriptor.to_string(), "dict[str, list[int] | none]");
    }

    #[test]
    fn version_keeps_registered_migrations() {
        fn bump(document: Document) -> Document {
            document
        }
        let composite = CompositeDescriptor::new("Evolved")
            .migration(1, bump)
            .version(3);
        let versioning = composite.versioning().unwrap();
        assert_eq!(versioning.version(), 3);
        assert!(versioning.migration(1).is_some());
        assert!(versioning.migration(2).is_none());
    }

    #[test]
    fn enum_lookups_work_both_ways() {
        let colors = EnumDescriptor::new("Color")
            .constant("Red", "red")
            .constant("Green", 2);
        assert_eq!(colors.value_of("Red"), Some(&Document::from("red")));
        assert_eq!(colors.name_of(&Document::from(2)), Some("Green"));
        assert_eq!(colors.name_of(&Document::from("blue")), None);
    }
}
