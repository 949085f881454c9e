//! Live collaborators a rebuilt context is bound to.
//!
//! None of these are data: each wraps a local process resource, so they are
//! supplied by whoever reconstructs the context and never appear on the wire.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::{error, info, warn};

/// Severity of a reported build event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLevel {
    Info,
    Warning,
    Error,
}

/// Receives progress and diagnostics from a build action.
pub trait EventSink: Send + Sync {
    fn report(&self, level: EventLevel, message: &str);
}

/// [`EventSink`] that forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn report(&self, level: EventLevel, message: &str) {
        match level {
            EventLevel::Info => info!(target: "dbr::events", "{message}"),
            EventLevel::Warning => warn!(target: "dbr::events", "{message}"),
            EventLevel::Error => error!(target: "dbr::events", "{message}"),
        }
    }
}

/// Cloneable handle to a byte stream shared by everything in one context.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl SharedWriter {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    pub fn sink() -> Self {
        Self::new(io::sink())
    }
}

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()
    }
}

impl fmt::Debug for SharedWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedWriter").finish_non_exhaustive()
    }
}

/// Resolved class path that compilers and annotation processors load from.
#[derive(Debug, PartialEq, Eq)]
pub struct ClassLoader {
    class_path: Vec<PathBuf>,
}

impl ClassLoader {
    pub fn class_path(&self) -> &[PathBuf] {
        &self.class_path
    }

    /// First class-path directory containing `resource`. Jar entries are not
    /// searched.
    pub fn find_resource(&self, resource: &str) -> Option<PathBuf> {
        self.class_path
            .iter()
            .map(|entry| entry.join(resource))
            .find(|candidate| candidate.is_file())
    }
}

/// Shares one [`ClassLoader`] per distinct class path across actions.
#[derive(Debug, Default)]
pub struct ClassLoaderCache {
    loaders: Mutex<HashMap<Vec<PathBuf>, Arc<ClassLoader>>>,
}

impl ClassLoaderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loader_for(&self, class_path: &[PathBuf]) -> Arc<ClassLoader> {
        let mut loaders = self.loaders.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(loaders.entry(class_path.to_vec()).or_insert_with(|| {
            Arc::new(ClassLoader {
                class_path: class_path.to_vec(),
            })
        }))
    }

    pub fn len(&self) -> usize {
        self.loaders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encodes structured payloads exchanged with compiler plugins.
pub trait PayloadCodec: Send + Sync {
    fn encode(&self, value: &Value) -> io::Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> io::Result<Value>;
}

/// [`PayloadCodec`] over `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PayloadCodec for JsonCodec {
    fn encode(&self, value: &Value) -> io::Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> io::Result<Value> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A command to run on behalf of a build action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Replaces the inherited environment entirely.
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs external processes.
pub trait ProcessExecutor: Send + Sync {
    fn execute(&self, request: &ProcessRequest) -> io::Result<ProcessOutput>;
}

/// [`ProcessExecutor`] over `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdProcessExecutor;

impl ProcessExecutor for StdProcessExecutor {
    fn execute(&self, request: &ProcessRequest) -> io::Result<ProcessOutput> {
        let mut command = Command::new(&request.program);
        command.args(&request.args).env_clear().envs(&request.env);
        if let Some(cwd) = &request.cwd {
            command.current_dir(cwd);
        }
        let output = command.output()?;
        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Everything a context needs that cannot be sent over the wire.
#[derive(Clone)]
pub struct ExecutionResources {
    pub event_sink: Arc<dyn EventSink>,
    pub stderr: SharedWriter,
    pub class_loader_cache: Arc<ClassLoaderCache>,
    pub codec: Arc<dyn PayloadCodec>,
    pub process_executor: Arc<dyn ProcessExecutor>,
}

impl ExecutionResources {
    /// Resources backed by this process: tracing, real stderr, `std::process`.
    pub fn local() -> Self {
        Self {
            event_sink: Arc::new(TracingEventSink),
            stderr: SharedWriter::stderr(),
            class_loader_cache: Arc::new(ClassLoaderCache::new()),
            codec: Arc::new(JsonCodec),
            process_executor: Arc::new(StdProcessExecutor),
        }
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    pub fn with_stderr(mut self, stderr: SharedWriter) -> Self {
        self.stderr = stderr;
        self
    }

    pub fn with_process_executor(mut self, executor: Arc<dyn ProcessExecutor>) -> Self {
        self.process_executor = executor;
        self
    }

    pub fn class_loader(&self, class_path: &[impl AsRef<Path>]) -> Arc<ClassLoader> {
        let class_path = class_path
            .iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect::<Vec<_>>();
        self.class_loader_cache.loader_for(&class_path)
    }
}

impl fmt::Debug for ExecutionResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionResources")
            .field("class_loaders", &self.class_loader_cache.len())
            .finish_non_exhaustive()
    }
}
