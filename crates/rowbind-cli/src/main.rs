// crates/rowbind-cli/src/main.rs
// ============================================================================
// Module: Rowbind CLI Entry Point
// Description: Command dispatcher for building and inspecting configurations.
// Purpose: Build a configuration from disk and report or dump the result.
// Dependencies: clap, rowbind-config, rowbind-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `rowbind check` builds a configuration document and its mapping units and
//! prints a summary; `rowbind dump` prints the resolved model as JSON. Any
//! build failure is reported on stderr with a failing exit code. Mapping
//! units resolve against the configuration's directory unless `--root` is
//! given.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use rowbind_config::ConfigBuilder;
use rowbind_config::ConfigError;
use rowbind_config::Configuration;
use rowbind_config::FileSystemSource;
use rowbind_config::read_node;
use rowbind_config::resolve_config_path;
use rowbind_core::DatabaseId;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "rowbind", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the configuration and print a summary.
    Check(BuildArgs),
    /// Build the configuration and print the resolved model as JSON.
    Dump(BuildArgs),
}

/// Arguments shared by every build command.
#[derive(Args, Debug, Clone, Default)]
struct BuildArgs {
    /// Configuration document (defaults to `ROWBIND_CONFIG`, then `rowbind.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory mapping-unit references resolve against.
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Environment to select instead of the document default.
    #[arg(long, value_name = "ID")]
    environment: Option<String>,
    /// Database id to use instead of the declared provider.
    #[arg(long = "database-id", value_name = "ID")]
    database_id: Option<String>,
    /// Report environment, database id, and loaded units on stderr.
    #[arg(long, short)]
    verbose: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI failures.
#[derive(Debug, Error)]
enum CliError {
    /// Configuration document could not be read.
    #[error("failed to load configuration {path}: {source}")]
    Load {
        /// Document path.
        path: String,
        /// Underlying cause.
        #[source]
        source: ConfigError,
    },
    /// Configuration could not be built.
    #[error("failed to build configuration: {0}")]
    Build(#[source] ConfigError),
    /// Resolved model could not be serialized.
    #[error("failed to serialize configuration model: {0}")]
    Serialize(String),
    /// Output stream write failed.
    #[error("failed to write {stream}: {source}")]
    Output {
        /// Stream label.
        stream: &'static str,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Check(args) => command_check(&args),
        Commands::Dump(args) => command_dump(&args),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes the `check` command.
fn command_check(args: &BuildArgs) -> CliResult<ExitCode> {
    let (path, config) = build(args)?;
    if args.verbose {
        for line in details(&config) {
            write_stderr_line(&line)?;
        }
    }
    write_stdout_line(&format!("configuration ok: {}", path.display()))?;
    for line in summary(&config) {
        write_stdout_line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes the `dump` command.
fn command_dump(args: &BuildArgs) -> CliResult<ExitCode> {
    let (_, config) = build(args)?;
    if args.verbose {
        for line in details(&config) {
            write_stderr_line(&line)?;
        }
    }
    write_stdout_line(&render_model(&config)?)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Build
// ============================================================================

/// Reads the configuration document and builds it against its unit root.
fn build(args: &BuildArgs) -> CliResult<(PathBuf, Configuration)> {
    let path = resolve_config_path(args.config.as_deref()).map_err(CliError::Build)?;
    let root = read_node(&path).map_err(|source| CliError::Load {
        path: path.display().to_string(),
        source,
    })?;
    let unit_root =
        args.root.clone().unwrap_or_else(|| path.parent().map(Path::to_path_buf).unwrap_or_default());

    let mut builder = ConfigBuilder::new(FileSystemSource::new(unit_root));
    if let Some(environment) = &args.environment {
        builder = builder.with_environment(environment.clone());
    }
    if let Some(database_id) = &args.database_id {
        builder = builder.with_database_id(DatabaseId::new(database_id.clone()));
    }
    let config = builder.parse(&root).map_err(CliError::Build)?;
    Ok((path, config))
}

/// Summarizes registry sizes, one line each.
fn summary(config: &Configuration) -> Vec<String> {
    vec![
        format!("units: {}", config.loaded_units().len()),
        format!("statements: {}", config.statements().len()),
        format!("result maps: {}", config.result_shapes().len()),
        format!("parameter maps: {}", config.parameter_shapes().len()),
        format!("caches: {}", config.caches().len()),
        format!("interceptors: {}", config.interceptors().len()),
    ]
}

/// Describes the selected environment, database id, and loaded units.
fn details(config: &Configuration) -> Vec<String> {
    let mut lines = vec![
        format!("environment: {}", config.environment().map_or("none", |environment| environment.id.as_str())),
        format!("database id: {}", config.database_id().map_or("none", DatabaseId::as_str)),
    ];
    lines.extend(config.loaded_units().iter().map(|unit| format!("loaded unit: {unit}")));
    lines
}

/// Renders the resolved model as pretty JSON.
fn render_model(config: &Configuration) -> CliResult<String> {
    serde_json::to_string_pretty(&config.snapshot()).map_err(|err| CliError::Serialize(err.to_string()))
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|source| CliError::Output {
        stream: "stdout",
        source,
    })
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> CliResult<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}").map_err(|source| CliError::Output {
        stream: "stderr",
        source,
    })
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
