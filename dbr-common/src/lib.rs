//! Shared building blocks for Distributed Build Replay.
//!
//! A build action that runs on a remote worker needs two things from the
//! machine that scheduled it:
//! - a fingerprint [`Manifest`] describing every file, directory and symlink
//!   the action read, small enough to ship over the network, and
//! - its execution configuration flattened into a [`context::WireMap`] that the
//!   worker can rebuild with its own local resources.
//!
//! The [`FingerprintRecorder`] produces the first by decorating a
//! [`ContentHasher`]; the [`context`] module implements the second.

pub mod api;
pub mod capability;
pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod manifest;
pub mod paths;
pub mod recorder;
pub mod symlink;
pub mod testing;
pub mod types;

pub use capability::{Blake3Hasher, ContentHasher, FileKind, OsFilesystem, ProjectFilesystem};
pub use config::{ConfigError, DistBuildConfig};
pub use context::{
    ContextError, ExecutionContext, ExecutionData, ExecutionResources, Verbosity, WireCodec,
    WireMap, deserialize_context, serialize_context,
};
pub use errors::{ErrorCategory, ErrorCode, ErrorEntry, RecordError};
pub use logging::{LogConfig, LogFormat, LoggingGuards, init_logging};
pub use manifest::{EntryKind, Manifest, ManifestEntry, ManifestSnapshot};
pub use paths::{normalize_lexically, relative_to_root};
pub use recorder::FingerprintRecorder;
pub use symlink::{Classification, DEFAULT_MAX_SYMLINK_DEPTH, SymlinkClassifier};
pub use types::{ArchiveMemberPath, ContentHash, UnixPath};
