//! Binary to generate Go structs from JSON Schema files.
//!
//! Usage: `schema-generate [-p package] [-o output.go] schema.json...`
//!
//! Writes the generated Go source to the `-o` file, or to stdout when no
//! output file is given. Log verbosity follows `RUST_LOG` (default `warn`).

use clap::{CommandFactory, Parser, error::ErrorKind};
use std::io::{stderr, stdout};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use schema_generate::{
    DEFAULT_PACKAGE_NAME, GenerateSettings, JsonSchemaGenError, generate_from_files,
    generate_to_writer, read_sources,
};

#[derive(Debug, Parser)]
#[command(name = "schema-generate", version, about = "Generate Go structs from JSON Schema.")]
struct Cli {
    /// Output file; stdout when omitted
    #[arg(short = 'o', value_name = "FILE")]
    output: Option<PathBuf>,

    /// Name of the generated Go package
    #[arg(short = 'p', value_name = "NAME", default_value = DEFAULT_PACKAGE_NAME)]
    package: String,

    /// Input JSON Schema file, in addition to any positional paths
    #[arg(short = 'i', value_name = "FILE")]
    input: Option<PathBuf>,

    /// Input JSON Schema files
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(stderr)
        .init();

    let cli = Cli::parse();
    let mut inputs: Vec<PathBuf> = cli.paths;
    inputs.extend(cli.input);
    if inputs.is_empty() {
        Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                "No input JSON Schema files.",
            )
            .exit();
    }

    let settings = GenerateSettings::with_package_name(cli.package);
    let result: Result<(), JsonSchemaGenError> = match &cli.output {
        Some(output_path) => generate_from_files(&inputs, output_path, &settings),
        None => read_sources(&inputs)
            .and_then(|sources| generate_to_writer(&sources, &mut stdout().lock(), &settings)),
    };
    if let Err(error) = result {
        report(&error);
        process::exit(1);
    }
}

fn report(error: &JsonSchemaGenError) {
    eprintln!("Error: {error}");
    if let Some(Err(unresolved)) = error.location().map(|location| &location.position) {
        eprintln!(
            "Couldn't find the line and character position of the error due to error {unresolved}"
        );
    }
}
