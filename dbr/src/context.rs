//! `dbr context`: validate, normalize and run execution context mappings.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use dbr_common::{
    ExecutionContext, ExecutionResources, WireMap, deserialize_context, serialize_context,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::CommandFailed;

#[derive(Subcommand)]
pub enum ContextCommand {
    /// Check that a mapping rebuilds into a context
    Check {
        /// JSON mapping, or `-` for stdin
        file: PathBuf,
    },

    /// Rebuild a mapping and print its canonical form
    Normalize {
        /// JSON mapping, or `-` for stdin
        file: PathBuf,
    },

    /// Rebuild a mapping and run a tool inside it
    Exec {
        /// JSON mapping, or `-` for stdin
        file: PathBuf,

        /// Program to run
        program: String,

        /// Program arguments
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

pub fn run(command: ContextCommand) -> Result<()> {
    match command {
        ContextCommand::Check { file } => {
            let context = load(&file)?;
            let data = &context.data;
            info!(file = %file.display(), "context mapping is valid");
            println!("verbosity:    {}", data.verbosity.as_str());
            println!("project root: {}", data.project_root.display());
            println!("inputs:       {}", data.absolute_input_paths.len());
            println!("env vars:     {}", data.env.len());
            println!(
                "direct jar:   {}",
                data.direct_to_jar
                    .as_ref()
                    .map_or("-", |settings| settings.output_path.as_str())
            );
            Ok(())
        }
        ContextCommand::Normalize { file } => {
            let context = load(&file)?;
            let wire = serialize_context(&context);
            println!("{}", serde_json::to_string_pretty(&Value::Object(wire))?);
            Ok(())
        }
        ContextCommand::Exec {
            file,
            program,
            args,
        } => {
            let context = load(&file)?;
            let output = context
                .run(&program, &args)
                .with_context(|| format!("failed to start {program}"))?;
            print!("{}", String::from_utf8_lossy(&output.stdout));
            if !output.success() {
                return Err(CommandFailed::Tool(output.exit_code.unwrap_or(1)).into());
            }
            Ok(())
        }
    }
}

fn read_mapping(file: &Path) -> Result<WireMap> {
    let raw = if file == Path::new("-") {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(file).with_context(|| format!("cannot read {}", file.display()))?
    };
    match serde_json::from_str::<Value>(&raw)
        .with_context(|| format!("{} is not valid JSON", file.display()))?
    {
        Value::Object(map) => Ok(map),
        other => bail!(
            "{} must hold a JSON object, found {}",
            file.display(),
            json_type(&other)
        ),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn load(file: &Path) -> Result<ExecutionContext> {
    let map = read_mapping(file)?;
    debug!(keys = map.len(), "read context mapping");
    match deserialize_context(&map, ExecutionResources::local()) {
        Ok(context) => Ok(context),
        Err(err) => Err(CommandFailed::catalog(err.code(), err.to_string()).into()),
    }
}
