use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::position::{OffsetOutOfRange, Position};

/// Where in an input document a parse failure was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Input file path or other label for the document.
    pub source_name: String,
    /// Byte offset of the failure.
    pub offset: usize,
    /// Human readable position, or why it could not be computed.
    pub position: Result<Position, OffsetOutOfRange>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Ok(position) => write!(
                f,
                "{} {position} (byte offset {})",
                self.source_name, self.offset
            ),
            Err(_) => write!(f, "{} byte offset {}", self.source_name, self.offset),
        }
    }
}

/// Error type for JSON Schema code generation operations.
#[derive(Debug, thiserror::Error)]
pub enum JsonSchemaGenError {
    /// The schema text is not well-formed JSON.
    #[error("cannot parse JSON schema due to a syntax error at {location}: {message}")]
    SchemaSyntax {
        location: SourceLocation,
        message: String,
    },

    /// A schema keyword holds a JSON value of the wrong type.
    #[error(
        "the JSON value cannot be converted into the schema{}: {message}. See input file {location}",
        keyword_suffix(.keyword.as_deref())
    )]
    SchemaTypeMismatch {
        location: SourceLocation,
        /// Nearest object key before the failure, when one could be found.
        keyword: Option<String>,
        message: String,
    },

    /// The schema is valid JSON but cannot be mapped to Go types.
    #[error("{message} at '{pointer}' in {source_name}")]
    UnsupportedSchema {
        source_name: String,
        pointer: String,
        message: String,
    },

    #[error("invalid package name '{0}'")]
    InvalidPackageName(String),

    #[error("failed to read the input file {}: {source}", .path.display())]
    ReadInput { path: PathBuf, source: io::Error },

    #[error("failed to write the output file {}: {source}", .path.display())]
    WriteOutput { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Fmt(#[from] fmt::Error),
}

impl JsonSchemaGenError {
    /// Source location of a parse failure, if this is one.
    #[must_use]
    pub const fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::SchemaSyntax { location, .. } | Self::SchemaTypeMismatch { location, .. } => {
                Some(location)
            }
            _ => None,
        }
    }
}

fn keyword_suffix(keyword: Option<&str>) -> String {
    keyword.map_or_else(String::new, |k| format!(" keyword '{k}'"))
}
