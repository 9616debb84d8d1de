// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! File formats selected by filename extension.

use std::fmt;

use blueprint_marshal::{Container, Descriptor, Document};

use crate::error::CodecError;
use crate::tabular;

/// Encoding of a stored file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    /// Pretty-printed JSON with two-space indent.
    Json,
    /// YAML (`.yml` or `.yaml`).
    Yaml,
    /// Comma-separated rows of flat records, with a header line.
    Csv,
}

impl Format {
    /// Format for `filename`, or `None` when the extension is not recognised.
    pub fn from_filename(filename: &str) -> Option<Self> {
        match extension(filename) {
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Encode `document`; `descriptor` drives the CSV header.
    pub fn encode(self, document: &Document, descriptor: &Descriptor) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Json => Ok(serde_json::to_vec_pretty(document)?),
            Self::Yaml => Ok(serde_yaml::to_string(document)?.into_bytes()),
            Self::Csv => tabular::encode(document, descriptor),
        }
    }

    /// Decode `raw`; `descriptor` drives CSV cell typing.
    pub fn decode(self, raw: &[u8], descriptor: &Descriptor) -> Result<Document, CodecError> {
        match self {
            Self::Json => Ok(serde_json::from_slice(raw)?),
            Self::Yaml => Ok(serde_yaml::from_slice(raw)?),
            Self::Csv => tabular::decode(raw, descriptor),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "JSON",
            Self::Yaml => "YAML",
            Self::Csv => "CSV",
        })
    }
}

/// Text after the last `.` of `filename`, or `""` without one.
pub fn extension(filename: &str) -> &str {
    filename.rsplit_once('.').map_or("", |(_, ext)| ext)
}

/// Document standing in for a missing or unreadable file.
///
/// Lists for sequence shapes, otherwise an empty object. Versioned composites
/// carry no marker, so they read as version 1 and run the full migration chain.
pub fn empty_document(descriptor: &Descriptor) -> Document {
    match descriptor {
        Descriptor::Sequence(_) | Descriptor::Untyped(Container::List) => Document::Array(Vec::new()),
        _ => Document::Object(serde_json::Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_marshal::{CompositeDescriptor, PrimitiveKind};
    use serde_json::json;

    #[test]
    fn extension_picks_codec() {
        assert_eq!(Format::from_filename("config.yml"), Some(Format::Yaml));
        assert_eq!(Format::from_filename("a.b.yaml"), Some(Format::Yaml));
        assert_eq!(Format::from_filename("state.json"), Some(Format::Json));
        assert_eq!(Format::from_filename("rows.csv"), Some(Format::Csv));
        assert_eq!(Format::from_filename("notes.txt"), None);
        assert_eq!(Format::from_filename("README"), None);
    }

    #[test]
    fn json_is_indented_with_two_spaces() {
        let raw = Format::Json
            .encode(&json!({"a": [1]}), &Descriptor::Opaque)
            .unwrap();
        assert_eq!(String::from_utf8(raw).unwrap(), "{\n  \"a\": [\n    1\n  ]\n}");
    }

    #[test]
    fn yaml_round_trips_documents() {
        let document = json!({"version": 2, "name": "x", "tags": ["a", "b"], "ratio": 0.5});
        let raw = Format::Yaml.encode(&document, &Descriptor::Opaque).unwrap();
        let back = Format::Yaml.decode(&raw, &Descriptor::Opaque).unwrap();
        assert_eq!(back, document);
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(Format::Json.decode(b"{not json", &Descriptor::Opaque).is_err());
        assert!(Format::Yaml.decode(b"a: [", &Descriptor::Opaque).is_err());
    }

    #[test]
    fn empty_document_matches_shape() {
        let versioned: Descriptor = CompositeDescriptor::new("State")
            .field_descriptor("a", Descriptor::Primitive(PrimitiveKind::Int), None)
            .version(3)
            .into();
        assert_eq!(empty_document(&versioned), json!({}));
        assert_eq!(
            empty_document(&Descriptor::sequence(Descriptor::Opaque)),
            json!([])
        );
        assert_eq!(empty_document(&Descriptor::Opaque), json!({}));
    }
}
