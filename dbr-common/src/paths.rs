//! Path canonicalization for manifest keys.
//!
//! Manifest keys must be deterministic across machines, so every path the
//! recorder sees is normalized lexically (no filesystem access) and then
//! rendered relative to the project root with `/` separators. Resolving
//! symlinks here would hide them from the classifier, so `realpath` is only
//! ever applied to symlink targets.

use std::path::{Component, Path, PathBuf};

use crate::errors::RecordError;
use crate::types::UnixPath;

/// Remove `.` components and fold `..` into the preceding component.
///
/// `..` directly under the filesystem root is dropped; leading `..` of a
/// relative path is kept.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().map(|c| c.as_os_str()).collect()
}

/// Resolve `path` against `root` when relative, then normalize.
pub fn absolutize(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&root.join(path))
    }
}

/// Render `path` relative to `root` as a manifest key.
///
/// The root itself maps to the empty key.
pub fn relative_to_root(root: &Path, path: &Path) -> Result<UnixPath, RecordError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| RecordError::OutsideProjectRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;

    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    Ok(UnixPath::new(parts.join("/")))
}

/// Prefixes of `path` from the path itself up to, but excluding, `root`.
///
/// `path` must already be normalized and under `root`; otherwise the chain is
/// empty.
pub fn prefix_chain(root: &Path, path: &Path) -> Vec<PathBuf> {
    if !path.starts_with(root) {
        return Vec::new();
    }
    path.ancestors()
        .take_while(|ancestor| *ancestor != root)
        .map(Path::to_path_buf)
        .collect()
}
