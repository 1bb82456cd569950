//! Parsing of JSON Schema documents.
//!
//! Only the keywords the builder maps to Go types are modeled; other keys are
//! ignored via serde's default behavior. `serde_json` failures are translated
//! into [`JsonSchemaGenError::SchemaSyntax`] or
//! [`JsonSchemaGenError::SchemaTypeMismatch`] with a resolved source position.

use serde::Deserialize;
use serde_json::error::Category;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{JsonSchemaGenError, SourceLocation};
use crate::position;

/// The `type` keyword: one type name or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TypeKeyword {
    Single(String),
    Multiple(Vec<String>),
}

impl TypeKeyword {
    /// Type names other than `null`, in schema order.
    #[must_use]
    pub fn non_null(&self) -> Vec<&str> {
        match self {
            Self::Single(name) => vec![name.as_str()],
            Self::Multiple(names) => names.iter().map(String::as_str).collect(),
        }
        .into_iter()
        .filter(|name| *name != "null")
        .collect()
    }
}

/// The `items` keyword. Tuple form is tried first so `[]` is not read as an
/// empty schema.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Items {
    Tuple(Vec<JsonSchema>),
    Single(Box<JsonSchema>),
}

/// The `additionalProperties` keyword.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<JsonSchema>),
}

/// Root or nested JSON Schema object.
///
/// Uses `BTreeMap` for deterministic property and definition traversal.
#[derive(Debug, Default, Deserialize)]
pub struct JsonSchema {
    #[serde(default, rename = "$ref")]
    pub reference: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub r#type: Option<TypeKeyword>,

    #[serde(default)]
    pub properties: Option<BTreeMap<String, JsonSchema>>,

    #[serde(default)]
    pub required: Option<Vec<String>>,

    #[serde(default)]
    pub items: Option<Items>,

    #[serde(default, rename = "additionalProperties")]
    pub additional_properties: Option<AdditionalProperties>,

    #[serde(default)]
    pub definitions: Option<BTreeMap<String, JsonSchema>>,

    #[serde(default, rename = "$defs")]
    pub defs: Option<BTreeMap<String, JsonSchema>>,

    #[serde(default, rename = "allOf")]
    pub all_of: Option<Vec<JsonSchema>>,

    #[serde(default, rename = "anyOf")]
    pub any_of: Option<Vec<JsonSchema>>,

    #[serde(default, rename = "oneOf")]
    pub one_of: Option<Vec<JsonSchema>>,
}

impl JsonSchema {
    /// True when the schema describes an object with named members, which the
    /// builder turns into a struct.
    #[must_use]
    pub fn is_object_like(&self) -> bool {
        self.properties.is_some()
            || self.all_of.as_ref().is_some_and(|members| !members.is_empty())
            || (self
                .r#type
                .as_ref()
                .is_some_and(|t| t.non_null() == ["object"])
                && self.additional_properties_schema().is_none())
    }

    /// The `additionalProperties` schema, when it is a schema and not a bool.
    #[must_use]
    pub fn additional_properties_schema(&self) -> Option<&JsonSchema> {
        match self.additional_properties.as_ref()? {
            AdditionalProperties::Schema(schema) => Some(schema),
            AdditionalProperties::Allowed(_) => None,
        }
    }

    /// `definitions` and `$defs` entries with the container keyword they
    /// were found under.
    pub fn definition_entries(&self) -> impl Iterator<Item = (&'static str, &String, &JsonSchema)> {
        let definitions = self
            .definitions
            .iter()
            .flatten()
            .map(|(key, schema)| ("definitions", key, schema));
        let defs = self
            .defs
            .iter()
            .flatten()
            .map(|(key, schema)| ("$defs", key, schema));
        definitions.chain(defs)
    }
}

/// Parse `text` as a JSON Schema document named `source_name` in diagnostics.
///
/// # Errors
///
/// Returns [`JsonSchemaGenError::SchemaSyntax`] for malformed JSON and
/// [`JsonSchemaGenError::SchemaTypeMismatch`] when a keyword holds a value of
/// the wrong JSON type.
pub fn parse_schema(source_name: &str, text: &str) -> Result<JsonSchema, JsonSchemaGenError> {
    serde_json::from_str(text).map_err(|error| diagnose(source_name, text, &error))
}

fn diagnose(source_name: &str, text: &str, error: &serde_json::Error) -> JsonSchemaGenError {
    let bytes: &[u8] = text.as_bytes();
    let offset: usize = position::byte_offset(bytes, error.line(), error.column());
    let location = SourceLocation {
        source_name: source_name.to_string(),
        offset,
        position: position::line_and_character(bytes, offset),
    };
    debug!(source = source_name, offset, category = ?error.classify(), "schema parse failed");

    let message: String = without_position(&error.to_string());
    match error.classify() {
        Category::Data => JsonSchemaGenError::SchemaTypeMismatch {
            keyword: enclosing_key(bytes, offset),
            location,
            message,
        },
        Category::Syntax | Category::Eof | Category::Io => {
            JsonSchemaGenError::SchemaSyntax { location, message }
        }
    }
}

/// `serde_json` appends " at line L column C"; the location is reported
/// separately.
fn without_position(message: &str) -> String {
    message
        .rsplit_once(" at line ")
        .map_or(message, |(head, _)| head)
        .to_string()
}

/// The last `"key":` that starts before `offset`.
fn enclosing_key(bytes: &[u8], offset: usize) -> Option<String> {
    let head: &[u8] = &bytes[..offset.min(bytes.len())];
    head.iter()
        .enumerate()
        .rev()
        .filter(|(_, byte)| **byte == b':')
        .find_map(|(colon, _)| quoted_suffix(head[..colon].trim_ascii_end()))
}

/// Decode a JSON string literal that ends `bytes`.
fn quoted_suffix(bytes: &[u8]) -> Option<String> {
    let (last, body) = bytes.split_last()?;
    if *last != b'"' {
        return None;
    }
    let open: usize = (0..body.len())
        .rev()
        .find(|&index| body[index] == b'"' && (index == 0 || body[index - 1] != b'\\'))?;
    serde_json::from_slice(&bytes[open..]).ok()
}
