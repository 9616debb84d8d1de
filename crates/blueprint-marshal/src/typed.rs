// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Static bridge between Rust types and the dynamic [`Value`] form.

use std::collections::{BTreeMap, HashMap};

use crate::descriptor::{Container, Descriptor, PrimitiveKind};
use crate::error::{describe_value, FieldPath, MarshalError};
use crate::value::{Document, Value};

/// A Rust type the marshaller can persist.
///
/// `descriptor` states the shape; `to_value`/`from_value` move between the
/// Rust type and the dynamic form. `from_value` receives values that already
/// passed descriptor validation, plus [`Value::Null`] for absent data, which
/// scalar and container impls read as their empty value.
///
/// ```
/// use blueprint_marshal::{CompositeDescriptor, Descriptor, MarshalError, Record, Typed, Value};
///
/// #[derive(Debug, PartialEq)]
/// struct Limits {
///     retries: i64,
///     hosts: Vec<String>,
/// }
///
/// impl Typed for Limits {
///     fn descriptor() -> Descriptor {
///         CompositeDescriptor::new("Limits")
///             .field_with_default("retries", &3_i64)
///             .field_with_default("hosts", &Vec::<String>::new())
///             .into()
///     }
///
///     fn to_value(&self) -> Value {
///         Record::new()
///             .with("retries", self.retries.to_value())
///             .with("hosts", self.hosts.to_value())
///             .into()
///     }
///
///     fn from_value(value: Value) -> Result<Self, MarshalError> {
///         let mut record = value.into_record()?;
///         Ok(Self {
///             retries: record.take_field("retries")?,
///             hosts: record.take_field("hosts")?,
///         })
///     }
/// }
///
/// let marshaller = blueprint_marshal::Marshaller::with_weak_types(false);
/// let document = marshaller.to_document(&Limits { retries: 5, hosts: vec![] }).unwrap();
/// assert_eq!(document, serde_json::json!({"retries": 5}));
/// ```
pub trait Typed: Sized {
    /// Shape of this type.
    fn descriptor() -> Descriptor;
    /// Dynamic form of `self`.
    fn to_value(&self) -> Value;
    /// Rebuild from the dynamic form.
    fn from_value(value: Value) -> Result<Self, MarshalError>;
}

fn mismatch(expected: impl std::fmt::Display, value: &Value) -> MarshalError {
    MarshalError::mismatch(&FieldPath::root(), expected, describe_value(value))
}

impl Typed for bool {
    fn descriptor() -> Descriptor {
        Descriptor::Primitive(PrimitiveKind::Bool)
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(mismatch(PrimitiveKind::Bool, &other)),
        }
    }
}

macro_rules! impl_typed_int {
    ($($ty:ty),* $(,)?) => {$(
        impl Typed for $ty {
            fn descriptor() -> Descriptor {
                Descriptor::Primitive(PrimitiveKind::Int)
            }

            fn to_value(&self) -> Value {
                Value::Int(i64::from(*self))
            }

            fn from_value(value: Value) -> Result<Self, MarshalError> {
                match value {
                    Value::Int(i) => <$ty>::try_from(i)
                        .map_err(|_| mismatch(stringify!($ty), &Value::Int(i))),
                    Value::Null => Ok(0),
                    other => Err(mismatch(PrimitiveKind::Int, &other)),
                }
            }
        }
    )*};
}

impl_typed_int!(i8, i16, i32, i64, u8, u16, u32);

impl Typed for f64 {
    fn descriptor() -> Descriptor {
        Descriptor::Primitive(PrimitiveKind::Float)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self, MarshalError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Null => Ok(0.0),
            other => Err(mismatch(PrimitiveKind::Float, &other)),
        }
    }
}

impl Typed for f32 {
    fn descriptor() -> Descriptor {
        Descriptor::Primitive(PrimitiveKind::Float)
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self, MarshalError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl Typed for String {
    fn descriptor() -> Descriptor {
        Descriptor::Primitive(PrimitiveKind::Str)
    }

    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        match value {
            Value::Str(s) => Ok(s),
            Value::Null => Ok(Self::new()),
            other => Err(mismatch(PrimitiveKind::Str, &other)),
        }
    }
}

impl<T: Typed> Typed for Option<T> {
    fn descriptor() -> Descriptor {
        Descriptor::optional(T::descriptor())
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Typed> Typed for Vec<T> {
    fn descriptor() -> Descriptor {
        Descriptor::sequence(T::descriptor())
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        match value {
            Value::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_value(item).map_err(|err| err.under(&i.to_string())))
                .collect(),
            Value::Null => Ok(Self::new()),
            other => Err(mismatch(Self::descriptor(), &other)),
        }
    }
}

fn entries<T: Typed, C: FromIterator<(String, T)>>(value: Value) -> Result<C, MarshalError> {
    match value {
        Value::Map(entries) => entries
            .into_iter()
            .map(|(k, v)| {
                let item = T::from_value(v).map_err(|err| err.under(&k))?;
                Ok((k, item))
            })
            .collect(),
        Value::Null => Ok(std::iter::empty().collect()),
        other => Err(mismatch(Descriptor::mapping(T::descriptor()), &other)),
    }
}

impl<T: Typed> Typed for BTreeMap<String, T> {
    fn descriptor() -> Descriptor {
        Descriptor::mapping(T::descriptor())
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        entries(value)
    }
}

impl<T: Typed, H: std::hash::BuildHasher + Default> Typed for HashMap<String, T, H> {
    fn descriptor() -> Descriptor {
        Descriptor::mapping(T::descriptor())
    }

    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.clone(), v.to_value())).collect())
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        entries(value)
    }
}

/// Raw documents pass through unvalidated.
impl Typed for Document {
    fn descriptor() -> Descriptor {
        Descriptor::Opaque
    }

    fn to_value(&self) -> Value {
        Value::from_document(self)
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        value.to_document()
    }
}

/// Untyped list, governed by the weak typing toggle.
impl Typed for Vec<Value> {
    fn descriptor() -> Descriptor {
        Descriptor::Untyped(Container::List)
    }

    fn to_value(&self) -> Value {
        Value::List(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        match value {
            Value::List(items) => Ok(items),
            Value::Null => Ok(Self::new()),
            other => Err(mismatch("list", &other)),
        }
    }
}

/// Untyped dict, governed by the weak typing toggle.
impl Typed for BTreeMap<String, Value> {
    fn descriptor() -> Descriptor {
        Descriptor::Untyped(Container::Dict)
    }

    fn to_value(&self) -> Value {
        Value::Map(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, MarshalError> {
        match value {
            Value::Map(entries) => Ok(entries),
            Value::Null => Ok(Self::new()),
            other => Err(mismatch("dict", &other)),
        }
    }
}
