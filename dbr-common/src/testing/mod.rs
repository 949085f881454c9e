//! Test support shared by unit and integration tests.
//!
//! - [`init_test_logging`]: JSONL capture of `tracing` output under
//!   `target/test-logs/`, plus compact output through the test writer.
//! - [`fixtures`]: in-memory filesystem and hasher for recorder tests.

pub mod fixtures;
pub mod log;

pub use fixtures::{MemoryFilesystem, MemoryHasher};
pub use log::init_test_logging;
