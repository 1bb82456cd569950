//! Generate Go structs from JSON Schema.

mod builder;
mod codegen;
mod error;
mod gofmt;
mod json_pointer;
mod model;
mod ordering;
mod position;
mod schema;
mod settings;

pub use builder::{SchemaDocument, build_model};
pub use codegen::{GENERATED_MARKER, render};
pub use error::{JsonSchemaGenError, SourceLocation};
pub use gofmt::{FormatError, format_source};
pub use model::{Alias, Field, Struct, TypeModel};
pub use ordering::{ordered_entries, ordered_keys};
pub use position::{OffsetOutOfRange, Position, line_and_character};
pub use schema::{JsonSchema, parse_schema};
pub use settings::{DEFAULT_PACKAGE_NAME, GenerateSettings};

use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// A schema document's text and the name used for it in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSource {
    pub name: String,
    pub text: String,
}

/// Read every file in `paths`, named by its path.
///
/// # Errors
///
/// Returns [`JsonSchemaGenError::ReadInput`] for the first file that cannot
/// be read.
pub fn read_sources<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SchemaSource>, JsonSchemaGenError> {
    paths
        .iter()
        .map(|path| {
            let path: &Path = path.as_ref();
            let text: String =
                fs::read_to_string(path).map_err(|source| JsonSchemaGenError::ReadInput {
                    path: path.to_path_buf(),
                    source,
                })?;
            Ok(SchemaSource {
                name: path.display().to_string(),
                text,
            })
        })
        .collect()
}

/// Generate one Go file declaring the types of all `sources`.
///
/// # Errors
///
/// Returns `JsonSchemaGenError` if a schema is malformed, cannot be mapped
/// to Go types, or the package name is invalid.
pub fn generate(
    sources: &[SchemaSource],
    settings: &GenerateSettings,
) -> Result<String, JsonSchemaGenError> {
    let documents: Vec<SchemaDocument> = sources
        .iter()
        .map(|source| {
            debug!(source = %source.name, bytes = source.text.len(), "parsing schema");
            Ok(SchemaDocument {
                source_name: source.name.clone(),
                schema: parse_schema(&source.name, &source.text)?,
            })
        })
        .collect::<Result<_, JsonSchemaGenError>>()?;

    let model: TypeModel = build_model(&documents)?;
    if model.is_empty() {
        warn!("the input schemas declare no types");
    }
    info!(
        structs = model.structs.len(),
        aliases = model.aliases.len(),
        "built type model"
    );
    render(&model, settings)
}

/// Generate Go source from `sources` and write it to `writer`.
///
/// Nothing is written unless generation succeeds.
///
/// # Errors
///
/// Returns `JsonSchemaGenError` if generation fails or writing to the writer
/// fails.
pub fn generate_to_writer<W: Write>(
    sources: &[SchemaSource],
    writer: &mut W,
    settings: &GenerateSettings,
) -> Result<(), JsonSchemaGenError> {
    let source: String = generate(sources, settings)?;
    writer.write_all(source.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Generate Go source from schema files and write it to `output_path`.
///
/// The output file is only created once generation has succeeded.
///
/// # Errors
///
/// Returns `JsonSchemaGenError` if reading an input fails, generation fails,
/// or writing the output file fails.
pub fn generate_from_files<P: AsRef<Path>>(
    input_paths: &[P],
    output_path: impl AsRef<Path>,
    settings: &GenerateSettings,
) -> Result<(), JsonSchemaGenError> {
    let sources: Vec<SchemaSource> = read_sources(input_paths)?;
    let source: String = generate(&sources, settings)?;
    let output_path: &Path = output_path.as_ref();
    fs::write(output_path, source).map_err(|source| JsonSchemaGenError::WriteOutput {
        path: output_path.to_path_buf(),
        source,
    })?;
    info!(path = %output_path.display(), "wrote Go source");
    Ok(())
}
