// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CSV encoding for flat lists of records.
//!
//! The header lists, in declaration order, every field that is non-empty in
//! at least one row. Lines end with CRLF. On read, empty cells are absent and
//! other cells are typed by the field's declared shape; cells that do not
//! parse stay strings so the unmarshaller can report them.

use blueprint_marshal::{
    is_falsy, CompositeDescriptor, Descriptor, Document, EnumDescriptor, PrimitiveKind,
};

use crate::error::CodecError;

fn row_shape(descriptor: &Descriptor) -> Option<&CompositeDescriptor> {
    match descriptor {
        Descriptor::Sequence(element) => element.as_composite(),
        _ => None,
    }
}

pub(crate) fn encode(document: &Document, descriptor: &Descriptor) -> Result<Vec<u8>, CodecError> {
    let composite = row_shape(descriptor).ok_or_else(|| {
        CodecError::Shape(format!("CSV is only supported for lists of records, got {descriptor}"))
    })?;
    let Document::Array(items) = document else {
        return Err(CodecError::Shape(format!("expecting a list of records, got {document}")));
    };
    let rows = items
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| CodecError::Shape(format!("expecting a record, got {item}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let header: Vec<&str> = composite
        .fields()
        .iter()
        .map(|field| field.name.as_str())
        .filter(|name| {
            rows.iter()
                .any(|row| row.get(*name).is_some_and(|value| !is_falsy(value)))
        })
        .collect();
    if header.is_empty() {
        return Ok(Vec::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(Vec::new());
    writer.write_record(&header)?;
    for row in rows {
        let cells = header
            .iter()
            .map(|name| cell(name, row.get(*name)))
            .collect::<Result<Vec<_>, _>>()?;
        writer.write_record(&cells)?;
    }
    writer
        .into_inner()
        .map_err(|err| CodecError::Csv(err.into_error().into()))
}

fn cell(name: &str, value: Option<&Document>) -> Result<String, CodecError> {
    match value {
        None | Some(Document::Null) => Ok(String::new()),
        Some(Document::String(s)) => Ok(s.clone()),
        Some(Document::Bool(b)) => Ok(b.to_string()),
        Some(Document::Number(n)) => Ok(n.to_string()),
        Some(nested) => Err(CodecError::Shape(format!(
            "{name}: nested value cannot be written as CSV: {nested}"
        ))),
    }
}

pub(crate) fn decode(raw: &[u8], descriptor: &Descriptor) -> Result<Document, CodecError> {
    let composite = row_shape(descriptor);
    let mut reader = csv::ReaderBuilder::new().from_reader(raw);
    let header = reader.headers()?.clone();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = serde_json::Map::with_capacity(header.len());
        for (name, text) in header.iter().zip(record.iter()) {
            if text.is_empty() {
                continue;
            }
            let typed = composite
                .and_then(|c| c.get(name))
                .and_then(|field| coerce(text, &field.descriptor));
            row.insert(
                name.to_string(),
                typed.unwrap_or_else(|| Document::String(text.to_string())),
            );
        }
        rows.push(Document::Object(row));
    }
    Ok(Document::Array(rows))
}

fn coerce(text: &str, descriptor: &Descriptor) -> Option<Document> {
    match descriptor {
        Descriptor::Primitive(PrimitiveKind::Int) => text.parse::<i64>().ok().map(Document::from),
        Descriptor::Primitive(PrimitiveKind::Float) => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Document::Number),
        Descriptor::Primitive(PrimitiveKind::Bool) => match text.to_ascii_lowercase().as_str() {
            "true" => Some(Document::Bool(true)),
            "false" => Some(Document::Bool(false)),
            _ => None,
        },
        Descriptor::Primitive(PrimitiveKind::Str) => Some(Document::String(text.to_string())),
        Descriptor::Union(alternatives) => alternatives.iter().find_map(|alt| coerce(text, alt)),
        Descriptor::Enumeration(enumeration) => enum_value(enumeration, text),
        _ => None,
    }
}

fn enum_value(enumeration: &EnumDescriptor, text: &str) -> Option<Document> {
    enumeration
        .constants()
        .map(|(_, value)| value)
        .find(|value| match value {
            Document::String(s) => s == text,
            other => other.to_string() == text,
        })
        .cloned()
}
