//! Go source emission.
//!
//! The emitter writes a loosely laid out Go file; [`crate::gofmt`] then
//! validates it and produces the canonical layout.

use std::fmt::{self, Write};
use tracing::debug;

use crate::error::JsonSchemaGenError;
use crate::gofmt;
use crate::model::{Alias, Field, Struct, TypeModel};
use crate::ordering::ordered_entries;
use crate::settings::GenerateSettings;

/// First line of every generated file, recognised by Go tooling as the
/// generated-code marker.
pub const GENERATED_MARKER: &str = "// Code generated by schema-generate. DO NOT EDIT.";

/// Render `model` as formatted Go source.
///
/// # Errors
///
/// Returns [`JsonSchemaGenError::InvalidPackageName`] when the configured
/// package name is not a usable Go package name.
///
/// # Panics
///
/// Panics when the emitted text is not valid Go. The model only carries
/// identifiers and type expressions built by this crate, so that is a bug in
/// the emitter, not a problem with the input.
pub fn render(model: &TypeModel, settings: &GenerateSettings) -> Result<String, JsonSchemaGenError> {
    if !gofmt::is_package_name(&settings.package_name) {
        return Err(JsonSchemaGenError::InvalidPackageName(
            settings.package_name.clone(),
        ));
    }

    let mut raw = String::new();
    emit_file(model, &settings.package_name, &mut raw)?;
    debug!(bytes = raw.len(), "emitted Go source");

    match gofmt::format_source(&raw) {
        Ok(formatted) => Ok(formatted),
        Err(error) => panic!("generated Go source is malformed ({error}):\n{raw}"),
    }
}

fn emit_file<W: Write>(model: &TypeModel, package_name: &str, writer: &mut W) -> fmt::Result {
    writeln!(writer, "{GENERATED_MARKER}")?;
    writeln!(writer)?;
    writeln!(writer, "package {package_name}")?;
    for (_, alias) in ordered_entries(&model.aliases) {
        emit_alias(alias, writer)?;
    }
    for (_, s) in ordered_entries(&model.structs) {
        emit_struct(s, writer)?;
    }
    Ok(())
}

fn emit_alias<W: Write>(alias: &Alias, writer: &mut W) -> fmt::Result {
    writeln!(writer)?;
    writeln!(writer, "// {}", alias.name)?;
    writeln!(writer, "type {} {}", alias.name, alias.r#type)
}

/// `// Name Description`, with each further description line on its own
/// comment line as written. Carriage returns are dropped.
fn emit_type_comment<W: Write>(
    name: &str,
    description: Option<&str>,
    writer: &mut W,
) -> fmt::Result {
    let Some(description) = description else {
        return writeln!(writer, "// {name}");
    };
    let mut lines = description
        .split('\n')
        .map(|line| line.replace('\r', ""));
    writeln!(writer, "// {name} {}", lines.next().unwrap_or_default())?;
    for line in lines {
        writeln!(writer, "// {line}")?;
    }
    Ok(())
}

fn emit_struct<W: Write>(s: &Struct, writer: &mut W) -> fmt::Result {
    writeln!(writer)?;
    emit_type_comment(&s.name, s.description.as_deref(), writer)?;
    writeln!(writer, "type {} struct {{", s.name)?;
    for (_, field) in ordered_entries(&s.fields) {
        writeln!(writer, "\t{} {} {}", field.name, field.r#type, struct_tag(field))?;
    }
    writeln!(writer, "}}")
}

/// The `json` struct tag, as a raw string literal when possible.
fn struct_tag(field: &Field) -> String {
    let options: &str = if field.required { "" } else { ",omitempty" };
    let tag: String = format!("json:\"{}{options}\"", escape_tag_value(&field.json_name));
    if tag.contains('`') {
        format!("\"{}\"", tag.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        format!("`{tag}`")
    }
}

/// Quote a JSON name for use between the double quotes of a tag value.
fn escape_tag_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => {
                // Infallible: writing to a String.
                let _ = write!(escaped, "\\u{:04x}", u32::from(c));
            }
            c => escaped.push(c),
        }
    }
    escaped
}
