//! Symlink classification for recorded paths.
//!
//! For a path `P` under the project root `R`, every prefix of `P` (from `P`
//! itself up to, but excluding, `R`) is tested with `is_symlink`. The
//! outermost symlink found wins: replaying it on a worker recreates access to
//! everything beneath it, including any inner links, so nothing below it
//! needs its own entry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::trace;

use crate::capability::{FileKind, ProjectFilesystem};
use crate::errors::RecordError;
use crate::paths::{normalize_lexically, prefix_chain};

/// Default bound on prefixes walked and on link hops followed.
pub const DEFAULT_MAX_SYMLINK_DEPTH: usize = 64;

/// How a path must be represented in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No symlink on the path; `kind` is what `stat` reports.
    Ordinary(FileKind),
    /// `link` is the outermost symlink on the path (possibly the path
    /// itself) and `target` its real path.
    RootSymlink { link: PathBuf, target: PathBuf },
}

/// Finds the outermost symlink along a path, caching resolved targets.
pub struct SymlinkClassifier {
    fs: Arc<dyn ProjectFilesystem>,
    max_depth: usize,
    real_paths: Mutex<HashMap<PathBuf, PathBuf>>,
}

impl SymlinkClassifier {
    pub fn new(fs: Arc<dyn ProjectFilesystem>, max_depth: usize) -> Self {
        Self {
            fs,
            max_depth: max_depth.max(1),
            real_paths: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Classify an absolute, lexically normalized path under the root.
    pub fn classify(&self, path: &Path) -> Result<Classification, RecordError> {
        let root = self.fs.root();
        if !path.starts_with(root) {
            return Err(RecordError::OutsideProjectRoot {
                path: path.to_path_buf(),
                root: root.to_path_buf(),
            });
        }

        let chain = prefix_chain(root, path);
        if chain.len() > self.max_depth {
            return Err(RecordError::ClassificationAmbiguity {
                path: path.to_path_buf(),
                max_depth: self.max_depth,
            });
        }

        // Chain runs from the path upward, so the last hit is the outermost.
        let mut outermost = None;
        for prefix in &chain {
            if self
                .fs
                .is_symlink(prefix)
                .map_err(|e| RecordError::io(prefix, e))?
            {
                outermost = Some(prefix);
            }
        }

        match outermost {
            Some(link) => {
                let target = self.real_path(link)?;
                trace!(link = %link.display(), target = %target.display(), "root symlink");
                Ok(Classification::RootSymlink {
                    link: link.clone(),
                    target,
                })
            }
            None => {
                let kind = self.fs.kind(path).map_err(|e| RecordError::io(path, e))?;
                Ok(Classification::Ordinary(kind))
            }
        }
    }

    /// Real path of a symlink, following at most `max_depth` hops.
    ///
    /// Chains longer than the bound (including cycles) fail with
    /// [`RecordError::ClassificationAmbiguity`].
    pub fn real_path(&self, link: &Path) -> Result<PathBuf, RecordError> {
        if let Some(cached) = self
            .real_paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(link)
        {
            return Ok(cached.clone());
        }

        let mut current = link.to_path_buf();
        let mut hops = 0;
        while self
            .fs
            .is_symlink(&current)
            .map_err(|e| RecordError::io(&current, e))?
        {
            hops += 1;
            if hops > self.max_depth {
                return Err(RecordError::ClassificationAmbiguity {
                    path: link.to_path_buf(),
                    max_depth: self.max_depth,
                });
            }
            let raw = self
                .fs
                .read_link(&current)
                .map_err(|e| RecordError::io(&current, e))?;
            let next = match current.parent() {
                Some(parent) if raw.is_relative() => parent.join(raw),
                _ => raw,
            };
            current = normalize_lexically(&next);
        }

        let resolved = self
            .fs
            .real_path(link)
            .map_err(|e| RecordError::io(link, e))?;
        self.real_paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(link.to_path_buf(), resolved.clone());
        Ok(resolved)
    }
}
