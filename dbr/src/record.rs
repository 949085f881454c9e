//! `dbr record`: hash inputs through a recorder and emit the manifest.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use dbr_common::config::{ResolvedConfig, Sourced};
use dbr_common::{
    Blake3Hasher, ConfigError, DistBuildConfig, FingerprintRecorder, Manifest, ManifestSnapshot, OsFilesystem,
    RecordError,
};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::CommandFailed;

#[derive(Args)]
pub struct RecordArgs {
    /// Project root; input paths are resolved against it
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to the per-user config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Inputs recorded in parallel
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Maximum symlink hops and path components examined per lookup
    #[arg(long)]
    max_symlink_depth: Option<usize>,

    /// Write the manifest here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Input files or directories
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

fn settings(args: &RecordArgs) -> Result<ResolvedConfig, ConfigError> {
    let (config, origin) = DistBuildConfig::load(args.config.as_deref())?;
    let mut resolved = config.resolve(origin.as_deref())?;
    resolved.threads = resolved
        .threads
        .or_override(args.threads.map(|n| Sourced::from_cli(n.max(1), "--threads")));
    resolved.max_symlink_depth = resolved.max_symlink_depth.or_override(
        args.max_symlink_depth
            .map(|n| Sourced::from_cli(n.max(1), "--max-symlink-depth")),
    );
    Ok(resolved)
}

pub async fn run(args: RecordArgs) -> Result<()> {
    let settings =
        settings(&args).map_err(|err| CommandFailed::catalog(err.code(), err.to_string()))?;
    debug!(threads = %settings.threads, max_symlink_depth = %settings.max_symlink_depth, "resolved settings");

    let fs = OsFilesystem::new(&args.root)
        .with_context(|| format!("cannot open project root {}", args.root.display()))?;
    let manifest = Arc::new(Manifest::new());
    let recorder = Arc::new(
        FingerprintRecorder::new(Blake3Hasher::new(), Arc::new(fs), Arc::clone(&manifest))
            .with_max_symlink_depth(settings.max_symlink_depth.value),
    );

    let failures = record_all(&recorder, &args.paths, settings.threads.value).await?;
    if let Some((path, err)) = failures.into_iter().next() {
        let detail = format!("{}: {err}", path.display());
        return Err(CommandFailed::catalog(err.code(), detail).into());
    }

    drop(recorder);
    let snapshot = match Arc::try_unwrap(manifest) {
        Ok(manifest) => manifest.into_snapshot(),
        Err(shared) => shared.snapshot(),
    };
    info!(inputs = args.paths.len(), entries = snapshot.len(), "recorded manifest");
    write_snapshot(&snapshot, args.output.as_deref())
}

/// Record every path with at most `threads` lookups in flight. Returns the
/// failures in input order.
async fn record_all(
    recorder: &Arc<FingerprintRecorder<Blake3Hasher>>,
    paths: &[PathBuf],
    threads: usize,
) -> Result<Vec<(PathBuf, RecordError)>> {
    let permits = Arc::new(Semaphore::new(threads));
    let mut handles = Vec::with_capacity(paths.len());
    for path in paths {
        let permit = Arc::clone(&permits).acquire_owned().await?;
        let recorder = Arc::clone(recorder);
        let path = path.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let result = recorder.get(&path);
            drop(permit);
            (path, result)
        }));
    }

    let mut failures = Vec::new();
    for handle in handles {
        let (path, result) = handle.await.context("recording task panicked")?;
        match result {
            Ok(hash) => debug!(path = %path.display(), %hash, "recorded input"),
            Err(err) => {
                warn!(path = %path.display(), code = %err.code().code_string(), "failed to record input: {err}");
                failures.push((path, err));
            }
        }
    }
    Ok(failures)
}

fn write_snapshot(snapshot: &ManifestSnapshot, output: Option<&Path>) -> Result<()> {
    let body = serde_json::to_string_pretty(snapshot)?;
    match output {
        Some(path) => {
            fs::write(path, body).with_context(|| format!("cannot write {}", path.display()))?;
            debug!(path = %path.display(), "wrote manifest");
        }
        None => println!("{body}"),
    }
    Ok(())
}
