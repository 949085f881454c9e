//! Capabilities the recorder is built on.
//!
//! [`ContentHasher`] and [`ProjectFilesystem`] are the two leaf seams: the
//! recorder decorates the former and queries the latter. Both are assumed
//! correct; their I/O errors are propagated as-is and never retried.
//!
//! [`OsFilesystem`] and [`Blake3Hasher`] are the local implementations used by
//! the `dbr` binary.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::types::{ArchiveMemberPath, ContentHash};

/// Hashes build inputs.
pub trait ContentHasher: Send + Sync {
    /// Content hash of the file at `path`.
    fn hash(&self, path: &Path) -> io::Result<ContentHash>;

    /// Size in bytes of the file at `path`.
    fn size(&self, path: &Path) -> io::Result<u64>;

    /// Content hash of one archive member, or `None` when the hasher has no
    /// hash for it.
    fn hash_archive_member(&self, member: &ArchiveMemberPath) -> io::Result<Option<ContentHash>>;
}

/// What `stat` reports for a path once symlinks are followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Directory,
}

/// Read-only view of the project filesystem.
pub trait ProjectFilesystem: Send + Sync {
    /// Absolute, symlink-free project root.
    fn root(&self) -> &Path;

    /// Stat `path`, following symlinks.
    fn kind(&self, path: &Path) -> io::Result<FileKind>;

    /// Whether `path` itself is a symlink. A missing path is not a symlink.
    fn is_symlink(&self, path: &Path) -> io::Result<bool>;

    /// Raw target of the symlink at `path`, as stored in the link.
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Fully resolved real path.
    fn real_path(&self, path: &Path) -> io::Result<PathBuf>;

    /// Names of the immediate children of a directory, in no particular order.
    fn list_children(&self, path: &Path) -> io::Result<Vec<String>>;
}

/// [`ProjectFilesystem`] backed by `std::fs`.
#[derive(Debug, Clone)]
pub struct OsFilesystem {
    root: PathBuf,
}

impl OsFilesystem {
    /// Create an accessor rooted at `root`, which is resolved to its real path.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = fs::canonicalize(root)?;
        Ok(Self { root })
    }
}

impl ProjectFilesystem for OsFilesystem {
    fn root(&self) -> &Path {
        &self.root
    }

    fn kind(&self, path: &Path) -> io::Result<FileKind> {
        let metadata = fs::metadata(path)?;
        if metadata.is_dir() {
            Ok(FileKind::Directory)
        } else {
            Ok(FileKind::File)
        }
    }

    fn is_symlink(&self, path: &Path) -> io::Result<bool> {
        match fs::symlink_metadata(path) {
            Ok(metadata) => Ok(metadata.file_type().is_symlink()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        fs::read_link(path)
    }

    fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn list_children(&self, path: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(names)
    }
}

/// Structural hash of a directory: blake3 over its sorted child names.
///
/// Each name is followed by a NUL byte so `["ab"]` and `["a", "b"]` differ.
pub fn structural_hash<S: AsRef<str>>(names: &[S]) -> ContentHash {
    let mut sorted = names.iter().map(|name| name.as_ref()).collect::<Vec<&str>>();
    sorted.sort_unstable();

    let mut hasher = blake3::Hasher::new();
    for name in sorted {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    ContentHash::from_blake3(hasher.finalize())
}

/// [`ContentHasher`] that streams file content through blake3.
///
/// Directories hash structurally (see [`structural_hash`]); archive members
/// are read through the `zip` crate.
#[derive(Debug, Clone, Default)]
pub struct Blake3Hasher;

impl Blake3Hasher {
    pub fn new() -> Self {
        Self
    }

    fn hash_reader(mut reader: impl Read) -> io::Result<ContentHash> {
        let mut hasher = blake3::Hasher::new();
        let mut buf = [0_u8; 64 * 1024];
        loop {
            let read = reader.read(&mut buf)?;
            if read == 0 {
                break;
            }
            hasher.update(&buf[..read]);
        }
        Ok(ContentHash::from_blake3(hasher.finalize()))
    }
}

impl ContentHasher for Blake3Hasher {
    fn hash(&self, path: &Path) -> io::Result<ContentHash> {
        if fs::metadata(path)?.is_dir() {
            let mut names = Vec::new();
            for entry in fs::read_dir(path)? {
                names.push(entry?.file_name().to_string_lossy().into_owned());
            }
            return Ok(structural_hash(&names));
        }
        Self::hash_reader(fs::File::open(path)?)
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(fs::metadata(path)?.len())
    }

    fn hash_archive_member(&self, member: &ArchiveMemberPath) -> io::Result<Option<ContentHash>> {
        let file = fs::File::open(&member.archive)?;
        let mut archive = zip::ZipArchive::new(file).map_err(io::Error::other)?;
        let mut entry = match archive.by_name(&member.member_name()) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(err) => return Err(io::Error::other(err)),
        };
        Self::hash_reader(&mut entry).map(Some)
    }
}
