//! Distributed Build Replay - command-line front end
//!
//! Records fingerprint manifests for build inputs and checks execution
//! context mappings before they are shipped to a worker.

#![forbid(unsafe_code)]

mod context;
mod record;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use dbr_common::api::{ApiError, schema};
use dbr_common::{ErrorCode, LogConfig, init_logging};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "dbr")]
#[command(author, version, about = "Distributed build replay - input manifests and context mappings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print failures as JSON error objects
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a fingerprint manifest for the given inputs
    Record(record::RecordArgs),

    /// Inspect execution context mappings
    #[command(subcommand)]
    Context(context::ContextCommand),

    /// Print a JSON schema or the error-code catalog
    Schema {
        #[arg(value_enum, required_unless_present = "export")]
        document: Option<SchemaDocument>,

        /// Write every document into this directory instead
        #[arg(long, conflicts_with = "document")]
        export: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaDocument {
    Manifest,
    Config,
    Errors,
    ApiError,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env("info").with_stderr();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let logging_guards = init_logging(&log_config)?;

    let json = cli.json;
    match run(cli.command).await {
        Ok(()) => Ok(()),
        Err(err) => match err.downcast::<CommandFailed>() {
            Ok(failure) => {
                let status = failure.report(json);
                // Flush the file writer before the process goes away.
                drop(logging_guards);
                std::process::exit(status);
            }
            Err(err) => Err(err),
        },
    }
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Record(args) => record::run(args).await,
        Commands::Context(command) => context::run(command),
        Commands::Schema { document, export } => {
            if let Some(dir) = export {
                for file in schema::export_schemas(&dir)? {
                    debug!(file, "wrote schema");
                    println!("{file}");
                }
                return Ok(());
            }
            let body = match document.unwrap_or(SchemaDocument::Manifest) {
                SchemaDocument::Manifest => {
                    serde_json::to_string_pretty(&schema::generate_manifest_schema())?
                }
                SchemaDocument::Config => {
                    serde_json::to_string_pretty(&schema::generate_config_schema())?
                }
                SchemaDocument::Errors => {
                    serde_json::to_string_pretty(&schema::generate_error_catalog())?
                }
                SchemaDocument::ApiError => {
                    serde_json::to_string_pretty(&schema::generate_api_error_schema())?
                }
            };
            println!("{body}");
            Ok(())
        }
    }
}

/// A command failure that decides the process exit status.
#[derive(Debug, Error)]
pub enum CommandFailed {
    /// Failure with a catalog code; exits with status 1.
    #[error("{detail}")]
    Catalog { code: ErrorCode, detail: String },

    /// A tool run on behalf of the user exited unsuccessfully.
    #[error("tool exited with status {0}")]
    Tool(i32),
}

impl CommandFailed {
    pub fn catalog(code: ErrorCode, detail: impl Into<String>) -> Self {
        Self::Catalog {
            code,
            detail: detail.into(),
        }
    }

    /// Print the failure and return the exit status to use.
    fn report(&self, json: bool) -> i32 {
        match self {
            Self::Catalog { code, detail } => {
                if json {
                    let body = ApiError::new(*code, detail.as_str());
                    match serde_json::to_string(&body) {
                        Ok(line) => println!("{line}"),
                        Err(_) => eprintln!("{code}: {detail}"),
                    }
                } else {
                    error!(code = %code.code_string(), "{detail}");
                    eprintln!("{}", code.entry().format_full());
                }
                1
            }
            Self::Tool(status) => *status,
        }
    }
}
