//! In-memory capabilities for recorder tests.
//!
//! [`MemoryFilesystem`] models directories, files and symlinks under a fake
//! project root; [`MemoryHasher`] hashes through it and can be told to fail.
//! Neither touches the real filesystem.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::capability::{ContentHasher, FileKind, ProjectFilesystem, structural_hash};
use crate::paths::normalize_lexically;
use crate::types::{ArchiveMemberPath, ContentHash};

const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File(Vec<u8>),
    Link(PathBuf),
}

/// Absolute-path tree of directories, files and symlinks.
#[derive(Debug, Clone)]
pub struct MemoryFilesystem {
    root: PathBuf,
    nodes: BTreeMap<PathBuf, Node>,
}

impl MemoryFilesystem {
    /// Empty tree whose project root is the directory `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut fs = Self {
            root: root.clone(),
            nodes: BTreeMap::new(),
        };
        fs.insert(root, Node::Dir);
        fs
    }

    pub fn dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.insert(path.into(), Node::Dir);
        self
    }

    pub fn file(mut self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) -> Self {
        self.insert(path.into(), Node::File(content.as_ref().to_vec()));
        self
    }

    pub fn symlink(mut self, path: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.insert(path.into(), Node::Link(target.into()));
        self
    }

    /// Insert a node, creating missing parent directories.
    fn insert(&mut self, path: PathBuf, node: Node) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() || self.nodes.contains_key(ancestor) {
                continue;
            }
            self.nodes.insert(ancestor.to_path_buf(), Node::Dir);
        }
        self.nodes.insert(path, node);
    }

    /// Follow every symlink on `path`, like `realpath` without the existence
    /// check.
    fn resolve(&self, path: &Path) -> io::Result<PathBuf> {
        let mut pending = Self::names_reversed(&normalize_lexically(path));
        let mut out = PathBuf::from("/");
        let mut hops = 0;
        while let Some(name) = pending.pop() {
            let candidate = out.join(&name);
            match self.nodes.get(&candidate) {
                Some(Node::Link(target)) => {
                    hops += 1;
                    if hops > MAX_LINK_HOPS {
                        return Err(io::Error::other("too many levels of symbolic links"));
                    }
                    let absolute = normalize_lexically(&out.join(target));
                    pending.extend(Self::names_reversed(&absolute));
                    out = PathBuf::from("/");
                }
                _ => out = candidate,
            }
        }
        Ok(out)
    }

    fn names_reversed(path: &Path) -> Vec<String> {
        path.components()
            .rev()
            .filter_map(|c| match c {
                Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect()
    }

    fn node(&self, path: &Path) -> io::Result<(PathBuf, Option<&Node>)> {
        let resolved = self.resolve(path)?;
        let node = self.nodes.get(&resolved);
        if node.is_none() && resolved != Path::new("/") {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            ));
        }
        Ok((resolved, node))
    }
}

impl ProjectFilesystem for MemoryFilesystem {
    fn root(&self) -> &Path {
        &self.root
    }

    fn kind(&self, path: &Path) -> io::Result<FileKind> {
        match self.node(path)? {
            (_, Some(Node::File(_))) => Ok(FileKind::File),
            _ => Ok(FileKind::Directory),
        }
    }

    fn is_symlink(&self, path: &Path) -> io::Result<bool> {
        Ok(matches!(self.nodes.get(path), Some(Node::Link(_))))
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        match self.nodes.get(path) {
            Some(Node::Link(target)) => Ok(target.clone()),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a symlink", path.display()),
            )),
        }
    }

    fn real_path(&self, path: &Path) -> io::Result<PathBuf> {
        self.node(path).map(|(resolved, _)| resolved)
    }

    fn list_children(&self, path: &Path) -> io::Result<Vec<String>> {
        let (dir, node) = self.node(path)?;
        if let Some(Node::File(_)) = node {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("{} is not a directory", path.display()),
            ));
        }
        Ok(self
            .nodes
            .keys()
            .filter(|candidate| candidate.parent() == Some(dir.as_path()))
            .filter_map(|candidate| candidate.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }
}

/// [`ContentHasher`] over a [`MemoryFilesystem`] with failure injection.
#[derive(Debug)]
pub struct MemoryHasher {
    fs: Arc<MemoryFilesystem>,
    members: HashMap<(PathBuf, String), ContentHash>,
    failures: Mutex<HashMap<PathBuf, usize>>,
    delay: Option<Duration>,
    hash_calls: AtomicUsize,
}

impl MemoryHasher {
    pub fn new(fs: Arc<MemoryFilesystem>) -> Self {
        Self {
            fs,
            members: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            delay: None,
            hash_calls: AtomicUsize::new(0),
        }
    }

    /// Serve `hash` for `member` inside the archive at `archive`.
    pub fn with_member(
        mut self,
        archive: impl Into<PathBuf>,
        member: impl Into<String>,
        hash: ContentHash,
    ) -> Self {
        self.members.insert((archive.into(), member.into()), hash);
        self
    }

    /// Sleep before every hash, to widen race windows.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make the next `times` hashes of `path` fail.
    pub fn fail(&self, path: impl Into<PathBuf>, times: usize) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.into(), times);
    }

    /// Number of `hash` calls seen so far, failed ones included.
    pub fn hash_calls(&self) -> usize {
        self.hash_calls.load(Ordering::SeqCst)
    }

    fn injected_failure(&self, path: &Path) -> io::Result<()> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        match failures.get_mut(path) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(io::Error::other(format!(
                    "injected failure for {}",
                    path.display()
                )))
            }
            _ => Ok(()),
        }
    }
}

impl ContentHasher for MemoryHasher {
    fn hash(&self, path: &Path) -> io::Result<ContentHash> {
        self.hash_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.injected_failure(path)?;
        match self.fs.node(path)? {
            (_, Some(Node::File(content))) => Ok(ContentHash::of_bytes(content)),
            _ => Ok(structural_hash(&self.fs.list_children(path)?)),
        }
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        match self.fs.node(path)? {
            (_, Some(Node::File(content))) => Ok(content.len() as u64),
            _ => Ok(0),
        }
    }

    fn hash_archive_member(&self, member: &ArchiveMemberPath) -> io::Result<Option<ContentHash>> {
        self.injected_failure(&member.archive)?;
        Ok(self
            .members
            .get(&(member.archive.clone(), member.member_name()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_links_on_any_prefix() {
        let fs = MemoryFilesystem::new("/p")
            .file("/ext/dir/f", "x")
            .symlink("/p/s", "/ext/dir")
            .symlink("/p/rel", "s/f");
        assert_eq!(
            fs.real_path(Path::new("/p/s/f")).unwrap(),
            PathBuf::from("/ext/dir/f")
        );
        assert_eq!(
            fs.real_path(Path::new("/p/rel")).unwrap(),
            PathBuf::from("/ext/dir/f")
        );
        assert_eq!(fs.kind(Path::new("/p/s")).unwrap(), FileKind::Directory);
        assert!(fs.is_symlink(Path::new("/p/s")).unwrap());
        assert!(!fs.is_symlink(Path::new("/p/s/f")).unwrap());
    }

    #[test]
    fn lists_children_and_reports_missing_paths() {
        let fs = MemoryFilesystem::new("/p").file("/p/a/x", "").dir("/p/a/y");
        let mut children = fs.list_children(Path::new("/p/a")).unwrap();
        children.sort();
        assert_eq!(children, vec!["x".to_string(), "y".to_string()]);

        let err = fs.kind(Path::new("/p/nope")).expect_err("missing");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn hasher_fails_the_requested_number_of_times() {
        let fs = Arc::new(MemoryFilesystem::new("/p").file("/p/f", "body"));
        let hasher = MemoryHasher::new(fs);
        hasher.fail("/p/f", 1);
        assert!(hasher.hash(Path::new("/p/f")).is_err());
        assert_eq!(
            hasher.hash(Path::new("/p/f")).unwrap(),
            ContentHash::of_bytes("body")
        );
        assert_eq!(hasher.hash_calls(), 2);
    }
}
