//! Fingerprint recorder.
//!
//! [`FingerprintRecorder`] wraps a [`ContentHasher`] and, as a side effect of
//! every lookup, appends the entries a remote worker needs to reproduce the
//! input to the shared [`Manifest`]:
//!
//! - a path with a symlink on it is represented by the outermost symlink
//!   alone, and its hash is the delegate's hash of the resolved path;
//! - a directory writes its own entry first, then records every child;
//! - a regular file gets a hash-and-size entry.
//!
//! A path is recorded at most once per manifest. Concurrent lookups of the
//! same path block until the first one is done and then reuse its result.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::capability::{ContentHasher, FileKind, ProjectFilesystem, structural_hash};
use crate::errors::RecordError;
use crate::manifest::{Claim, Manifest, ManifestEntry, archive_member_key};
use crate::paths::{absolutize, relative_to_root};
use crate::symlink::{Classification, DEFAULT_MAX_SYMLINK_DEPTH, SymlinkClassifier};
use crate::types::{ArchiveMemberPath, ContentHash, UnixPath};

/// Content hasher decorator that records a fingerprint manifest.
pub struct FingerprintRecorder<H> {
    delegate: H,
    fs: Arc<dyn ProjectFilesystem>,
    classifier: SymlinkClassifier,
    manifest: Arc<Manifest>,
}

impl<H: ContentHasher> FingerprintRecorder<H> {
    pub fn new(delegate: H, fs: Arc<dyn ProjectFilesystem>, manifest: Arc<Manifest>) -> Self {
        let classifier = SymlinkClassifier::new(Arc::clone(&fs), DEFAULT_MAX_SYMLINK_DEPTH);
        Self {
            delegate,
            fs,
            classifier,
            manifest,
        }
    }

    /// Bound the symlink ancestor walk and link-chain resolution.
    pub fn with_max_symlink_depth(mut self, max_depth: usize) -> Self {
        self.classifier = SymlinkClassifier::new(Arc::clone(&self.fs), max_depth);
        self
    }

    pub fn manifest(&self) -> &Arc<Manifest> {
        &self.manifest
    }

    pub fn delegate(&self) -> &H {
        &self.delegate
    }

    pub fn root(&self) -> &Path {
        self.fs.root()
    }

    /// Record `path` (absolute, or relative to the project root) and return
    /// its content hash.
    pub fn get(&self, path: &Path) -> Result<ContentHash, RecordError> {
        let abs = absolutize(self.fs.root(), path);
        let key = relative_to_root(self.fs.root(), &abs)?;

        if let Some(hash) = self.manifest.recorded_hash(&key) {
            trace!(path = %key, "already recorded");
            return Ok(hash);
        }

        match self.classifier.classify(&abs)? {
            Classification::RootSymlink { link, target } => {
                self.record_root_symlink(&abs, &link, &target)
            }
            Classification::Ordinary(FileKind::File) => self.record_file(&abs, key),
            Classification::Ordinary(FileKind::Directory) => self.record_directory(&abs, key),
        }
    }

    /// Record `path` and return the delegate's size for it.
    pub fn get_size(&self, path: &Path) -> Result<u64, RecordError> {
        self.get(path)?;
        let abs = absolutize(self.fs.root(), path);
        self.delegate
            .size(&abs)
            .map_err(|e| RecordError::io(abs, e))
    }

    /// Record a single archive member and return its hash.
    ///
    /// An archive reached through a symlink is represented by that symlink
    /// alone, like any other path beneath it. A delegate with no hash for the
    /// member is treated as an I/O failure.
    pub fn get_archive_member(&self, member: &ArchiveMemberPath) -> Result<ContentHash, RecordError> {
        let archive = absolutize(self.fs.root(), &member.archive);
        let archive_key = relative_to_root(self.fs.root(), &archive)?;
        let name = member.member_name();
        let key = archive_member_key(&archive_key, &name);

        if let Some(hash) = self.manifest.recorded_hash(&key) {
            trace!(member = %key, "already recorded");
            return Ok(hash);
        }
        if let Classification::RootSymlink { link, target } = self.classifier.classify(&archive)? {
            let resolved = resolve_through_link(&archive, &link, &target);
            let lookup = ArchiveMemberPath::new(resolved, member.member.clone());
            let hash = match self.delegate.hash_archive_member(&lookup) {
                Ok(Some(hash)) => hash,
                Ok(None) => return Err(missing_member(archive, &name)),
                Err(e) => {
                    warn!(member = %key, error = %e, "archive member hash through symlink failed");
                    return Err(RecordError::io(archive, e));
                }
            };
            self.record_link(&link, &target)?;
            return Ok(hash);
        }

        if let Some(hash) = self.owned_or_recorded(&key, &archive)? {
            return Ok(hash);
        }

        let lookup = ArchiveMemberPath::new(archive.clone(), member.member.clone());
        let hash = match self.delegate.hash_archive_member(&lookup) {
            Ok(Some(hash)) => hash,
            Ok(None) => {
                self.manifest.release(&key);
                warn!(member = %key, "no hash for archive member");
                return Err(missing_member(archive, &name));
            }
            Err(e) => {
                self.manifest.release(&key);
                warn!(member = %key, error = %e, "archive member hash failed");
                return Err(RecordError::io(archive, e));
            }
        };

        self.manifest.append(ManifestEntry::ArchiveMember {
            path: archive_key,
            member: name,
            hash: hash.clone(),
        });
        self.manifest.finish(&key, Some(hash.clone()));
        debug!(member = %key, hash = %hash, "recorded archive member");
        Ok(hash)
    }

    /// Claim a non-directory key. `None` means the caller now owns it.
    fn owned_or_recorded(
        &self,
        key: &UnixPath,
        abs: &Path,
    ) -> Result<Option<ContentHash>, RecordError> {
        match self.manifest.claim(key) {
            Claim::Acquired => Ok(None),
            Claim::Recorded(Some(hash)) => Ok(Some(hash)),
            // Recorded as a root symlink by an earlier lookup.
            Claim::Recorded(None) => self
                .delegate
                .hash(abs)
                .map(Some)
                .map_err(|e| RecordError::io(abs, e)),
            // Was a directory when first seen; keep that claim as it was.
            Claim::Resumed { hash, children } => {
                self.manifest.interrupt(key, hash, children);
                self.delegate
                    .hash(abs)
                    .map(Some)
                    .map_err(|e| RecordError::io(abs, e))
            }
        }
    }

    fn record_root_symlink(
        &self,
        abs: &Path,
        link: &Path,
        target: &Path,
    ) -> Result<ContentHash, RecordError> {
        let resolved = resolve_through_link(abs, link, target);
        let hash = self.delegate.hash(&resolved).map_err(|e| {
            warn!(path = %abs.display(), resolved = %resolved.display(), error = %e, "hash through symlink failed");
            RecordError::io(abs, e)
        })?;
        self.record_link(link, target)?;
        Ok(hash)
    }

    /// Write the entry for an outermost symlink unless it already has one.
    fn record_link(&self, link: &Path, target: &Path) -> Result<(), RecordError> {
        let link_key = relative_to_root(self.fs.root(), link)?;
        match self.manifest.claim(&link_key) {
            Claim::Acquired => {
                self.manifest.append(ManifestEntry::RootSymlink {
                    path: link_key.clone(),
                    target: self.target_key(target),
                });
                self.manifest.finish(&link_key, None);
                debug!(path = %link_key, target = %target.display(), "recorded root symlink");
            }
            Claim::Resumed { hash, children } => {
                self.manifest.interrupt(&link_key, hash, children);
            }
            Claim::Recorded(_) => trace!(path = %link_key, "root symlink already recorded"),
        }
        Ok(())
    }

    /// Targets inside the project are stored relative to the root; only
    /// external targets keep their absolute real path.
    fn target_key(&self, target: &Path) -> UnixPath {
        relative_to_root(self.fs.root(), target).unwrap_or_else(|_| UnixPath::from_path(target))
    }

    fn record_file(&self, abs: &Path, key: UnixPath) -> Result<ContentHash, RecordError> {
        if let Some(hash) = self.owned_or_recorded(&key, abs)? {
            return Ok(hash);
        }

        let hashed = self
            .delegate
            .hash(abs)
            .and_then(|hash| Ok((hash, self.delegate.size(abs)?)));
        let (hash, size) = match hashed {
            Ok(found) => found,
            Err(e) => {
                self.manifest.release(&key);
                warn!(path = %key, error = %e, "file hash failed");
                return Err(RecordError::io(abs, e));
            }
        };

        self.manifest.append(ManifestEntry::File {
            path: key.clone(),
            hash: hash.clone(),
            size,
        });
        self.manifest.finish(&key, Some(hash.clone()));
        debug!(path = %key, hash = %hash, size, "recorded file");
        Ok(hash)
    }

    fn record_directory(&self, abs: &Path, key: UnixPath) -> Result<ContentHash, RecordError> {
        let (hash, children) = match self.manifest.claim(&key) {
            Claim::Recorded(Some(hash)) => return Ok(hash),
            Claim::Recorded(None) => {
                return self.delegate.hash(abs).map_err(|e| RecordError::io(abs, e));
            }
            Claim::Resumed { hash, children } => {
                debug!(path = %key, "resuming interrupted directory");
                (hash, children)
            }
            Claim::Acquired => {
                let mut children = match self.fs.list_children(abs) {
                    Ok(children) => children,
                    Err(e) => {
                        self.manifest.release(&key);
                        warn!(path = %key, error = %e, "directory listing failed");
                        return Err(RecordError::io(abs, e));
                    }
                };
                children.sort();
                let hash = structural_hash(&children);
                self.manifest.append(ManifestEntry::Directory {
                    path: key.clone(),
                    hash: hash.clone(),
                    children: children.clone(),
                });
                debug!(path = %key, hash = %hash, children = children.len(), "recorded directory");
                (hash, children)
            }
        };

        for name in &children {
            let child: PathBuf = abs.join(name);
            if let Err(err) = self.get(&child) {
                self.manifest.interrupt(&key, hash.clone(), children.clone());
                return Err(err);
            }
        }

        self.manifest.finish(&key, Some(hash.clone()));
        Ok(hash)
    }
}

/// `abs` with its `link` prefix replaced by the link's real `target`.
fn resolve_through_link(abs: &Path, link: &Path, target: &Path) -> PathBuf {
    match abs.strip_prefix(link) {
        Ok(rest) if !rest.as_os_str().is_empty() => target.join(rest),
        _ => target.to_path_buf(),
    }
}

fn missing_member(archive: PathBuf, name: &str) -> RecordError {
    RecordError::io(
        archive,
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("no hash for archive member {name}"),
        ),
    )
}

impl<H: ContentHasher> ContentHasher for FingerprintRecorder<H> {
    fn hash(&self, path: &Path) -> io::Result<ContentHash> {
        self.get(path).map_err(io::Error::from)
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        self.get_size(path).map_err(io::Error::from)
    }

    fn hash_archive_member(&self, member: &ArchiveMemberPath) -> io::Result<Option<ContentHash>> {
        self.get_archive_member(member)
            .map(Some)
            .map_err(io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::EntryKind;
    use crate::testing::fixtures::{MemoryFilesystem, MemoryHasher};
    use std::thread;
    use std::time::Duration;

    fn recorder(fs: MemoryFilesystem) -> FingerprintRecorder<MemoryHasher> {
        let fs = Arc::new(fs);
        let hasher = MemoryHasher::new(Arc::clone(&fs));
        FingerprintRecorder::new(hasher, fs, Arc::new(Manifest::new()))
    }

    fn keys(recorder: &FingerprintRecorder<MemoryHasher>) -> Vec<String> {
        recorder
            .manifest()
            .snapshot()
            .entries
            .iter()
            .map(|entry| entry.key().as_str().to_string())
            .collect()
    }

    #[test]
    fn direct_symlink_records_single_root_symlink() {
        let recorder = recorder(
            MemoryFilesystem::new("/proj")
                .file("/ext/file", "payload")
                .symlink("/proj/link", "/ext/file"),
        );

        let hash = recorder.get(Path::new("link")).expect("recorded");
        assert_eq!(hash, ContentHash::of_bytes("payload"));

        let snapshot = recorder.manifest().snapshot();
        assert_eq!(
            snapshot.entries,
            vec![ManifestEntry::RootSymlink {
                path: UnixPath::new("link"),
                target: UnixPath::new("/ext/file"),
            }]
        );
    }

    #[test]
    fn ancestor_symlink_records_only_the_ancestor() {
        let recorder = recorder(
            MemoryFilesystem::new("/proj")
                .file("/ext/dir/file", "inner")
                .symlink("/proj/linkdir", "/ext/dir"),
        );

        let hash = recorder
            .get(Path::new("/proj/linkdir/file"))
            .expect("recorded");
        assert_eq!(hash, ContentHash::of_bytes("inner"));
        assert_eq!(keys(&recorder), vec!["linkdir"]);
        assert_eq!(
            recorder.manifest().snapshot().entries[0].kind(),
            EntryKind::RootSymlink
        );
    }

    #[test]
    fn directory_records_every_descendant_parent_first() {
        let recorder = recorder(
            MemoryFilesystem::new("/proj")
                .file("/proj/a/b/c", "c")
                .dir("/proj/a/b/d")
                .file("/proj/a/e", "e"),
        );

        recorder.get(Path::new("a")).expect("recorded");

        let keys = keys(&recorder);
        assert_eq!(keys.len(), 5);
        for expected in ["a", "a/b", "a/b/c", "a/b/d", "a/e"] {
            assert!(keys.contains(&expected.to_string()), "missing {expected}");
        }
        let position = |k: &str| keys.iter().position(|x| x == k).unwrap();
        assert!(position("a") < position("a/b"));
        assert!(position("a/b") < position("a/b/c"));
    }

    #[test]
    fn directory_hash_is_structural_and_children_sorted() {
        let recorder = recorder(
            MemoryFilesystem::new("/proj")
                .file("/proj/d/zeta", "")
                .file("/proj/d/alpha", ""),
        );

        let hash = recorder.get(Path::new("d")).unwrap();
        assert_eq!(hash, structural_hash(&["alpha", "zeta"]));
        match recorder.manifest().snapshot().find("d") {
            Some(ManifestEntry::Directory { children, .. }) => {
                assert_eq!(children, &vec!["alpha".to_string(), "zeta".to_string()]);
            }
            other => panic!("expected directory entry, got {other:?}"),
        }
    }

    #[test]
    fn empty_directory_gets_entry_with_no_children() {
        let recorder = recorder(MemoryFilesystem::new("/proj").dir("/proj/empty"));
        recorder.get(Path::new("empty")).unwrap();
        assert_eq!(keys(&recorder), vec!["empty"]);
    }

    #[test]
    fn repeated_lookup_does_not_append_again() {
        let recorder = recorder(MemoryFilesystem::new("/proj").file("/proj/f", "x"));
        let first = recorder.get(Path::new("f")).unwrap();
        let second = recorder.get(Path::new("./f")).unwrap();
        assert_eq!(first, second);
        assert_eq!(recorder.manifest().len(), 1);
        assert_eq!(recorder.delegate().hash_calls(), 1);
    }

    #[test]
    fn file_under_recorded_symlink_adds_nothing_new() {
        let recorder = recorder(
            MemoryFilesystem::new("/proj")
                .file("/ext/dir/a", "a")
                .file("/ext/dir/b", "b")
                .symlink("/proj/s", "/ext/dir"),
        );
        recorder.get(Path::new("s/a")).unwrap();
        recorder.get(Path::new("s/b")).unwrap();
        recorder.get(Path::new("s")).unwrap();
        assert_eq!(keys(&recorder), vec!["s"]);
    }

    #[test]
    fn symlink_inside_directory_is_recorded_as_root_symlink() {
        let recorder = recorder(
            MemoryFilesystem::new("/proj")
                .file("/proj/d/real", "r")
                .file("/ext/shared/x", "x")
                .symlink("/proj/d/shared", "/ext/shared"),
        );
        recorder.get(Path::new("d")).unwrap();
        let snapshot = recorder.manifest().snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(
            snapshot.find("d/shared").map(ManifestEntry::kind),
            Some(EntryKind::RootSymlink)
        );
        assert!(snapshot.find("d/shared/x").is_none());
    }

    #[test]
    fn failed_file_leaves_no_entry_and_retry_succeeds() {
        let recorder = recorder(MemoryFilesystem::new("/proj").file("/proj/f", "x"));
        recorder.delegate().fail("/proj/f", 1);

        let err = recorder.get(Path::new("f")).expect_err("injected failure");
        assert!(matches!(err, RecordError::Io { .. }));
        assert!(recorder.manifest().is_empty());
        assert!(!recorder.manifest().is_visited(&UnixPath::new("f")));

        recorder.get(Path::new("f")).expect("retry succeeds");
        assert_eq!(keys(&recorder), vec!["f"]);
    }

    #[test]
    fn failed_child_keeps_directory_entry_and_retry_resumes() {
        let recorder = recorder(
            MemoryFilesystem::new("/proj")
                .file("/proj/d/ok", "1")
                .file("/proj/d/flaky", "2"),
        );
        recorder.delegate().fail("/proj/d/flaky", 1);

        recorder.get(Path::new("d")).expect_err("child failure propagates");
        let after_failure = keys(&recorder);
        assert!(after_failure.contains(&"d".to_string()));
        assert!(!after_failure.contains(&"d/flaky".to_string()));

        recorder.get(Path::new("d")).expect("retry succeeds");
        let keys = keys(&recorder);
        assert_eq!(keys.iter().filter(|k| *k == "d").count(), 1);
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn missing_path_is_io_failure() {
        let recorder = recorder(MemoryFilesystem::new("/proj"));
        let err = recorder.get(Path::new("nope")).expect_err("missing");
        assert!(matches!(err, RecordError::Io { .. }));
        assert!(recorder.manifest().is_empty());
    }

    #[test]
    fn broken_symlink_fails_when_hashing() {
        let recorder = recorder(MemoryFilesystem::new("/proj").symlink("/proj/dangling", "/gone"));
        let err = recorder.get(Path::new("dangling")).expect_err("broken link");
        assert!(matches!(err, RecordError::Io { .. }));
    }

    #[test]
    fn outside_root_is_rejected() {
        let recorder = recorder(MemoryFilesystem::new("/proj").file("/other/f", ""));
        let err = recorder.get(Path::new("/other/f")).expect_err("outside root");
        assert!(matches!(err, RecordError::OutsideProjectRoot { .. }));
    }

    #[test]
    fn deep_path_beyond_bound_is_ambiguous() {
        let recorder = recorder(MemoryFilesystem::new("/proj").file("/proj/a/b/c/d", ""))
            .with_max_symlink_depth(3);
        let err = recorder.get(Path::new("a/b/c/d")).expect_err("too deep");
        assert!(matches!(
            err,
            RecordError::ClassificationAmbiguity { max_depth: 3, .. }
        ));
    }

    #[test]
    fn get_size_records_and_reports_size() {
        let recorder = recorder(MemoryFilesystem::new("/proj").file("/proj/f", "12345"));
        assert_eq!(recorder.get_size(Path::new("f")).unwrap(), 5);
        assert_eq!(keys(&recorder), vec!["f"]);
    }

    #[test]
    fn archive_member_is_recorded_once() {
        let fs = Arc::new(MemoryFilesystem::new("/proj").file("/proj/lib.jar", "zip"));
        let hasher = MemoryHasher::new(Arc::clone(&fs)).with_member(
            "/proj/lib.jar",
            "com/Foo.class",
            ContentHash::of_bytes("foo"),
        );
        let recorder = FingerprintRecorder::new(hasher, fs, Arc::new(Manifest::new()));
        let member = ArchiveMemberPath::new("lib.jar", "com/Foo.class");

        assert_eq!(
            recorder.get_archive_member(&member).unwrap(),
            ContentHash::of_bytes("foo")
        );
        recorder.get_archive_member(&member).unwrap();
        assert_eq!(keys(&recorder), vec!["lib.jar!/com/Foo.class"]);
    }

    #[test]
    fn internal_symlink_target_is_stored_relative_to_root() {
        let recorder = recorder(
            MemoryFilesystem::new("/proj")
                .file("/proj/real/x.h", "x")
                .symlink("/proj/alias", "/proj/real"),
        );

        let hash = recorder.get(Path::new("alias/x.h")).unwrap();
        assert_eq!(hash, ContentHash::of_bytes("x"));
        assert_eq!(
            recorder.manifest().snapshot().entries,
            vec![ManifestEntry::RootSymlink {
                path: UnixPath::new("alias"),
                target: UnixPath::new("real"),
            }]
        );
    }

    #[test]
    fn archive_under_symlinked_directory_records_the_link() {
        let fs = Arc::new(
            MemoryFilesystem::new("/proj")
                .file("/ext/libs/lib.jar", "zip")
                .symlink("/proj/libs", "/ext/libs"),
        );
        let hasher = MemoryHasher::new(Arc::clone(&fs)).with_member(
            "/ext/libs/lib.jar",
            "A.class",
            ContentHash::of_bytes("a"),
        );
        let recorder = FingerprintRecorder::new(hasher, fs, Arc::new(Manifest::new()));
        let member = ArchiveMemberPath::new("libs/lib.jar", "A.class");

        assert_eq!(
            recorder.get_archive_member(&member).unwrap(),
            ContentHash::of_bytes("a")
        );
        recorder.get_archive_member(&member).unwrap();
        assert_eq!(
            recorder.manifest().snapshot().entries,
            vec![ManifestEntry::RootSymlink {
                path: UnixPath::new("libs"),
                target: UnixPath::new("/ext/libs"),
            }]
        );
    }

    #[test]
    fn archive_under_symlink_without_member_hash_writes_nothing() {
        let recorder = recorder(
            MemoryFilesystem::new("/proj")
                .file("/ext/libs/lib.jar", "zip")
                .symlink("/proj/libs", "/ext/libs"),
        );
        let member = ArchiveMemberPath::new("libs/lib.jar", "Missing.class");
        let err = recorder.get_archive_member(&member).expect_err("absent hash");
        assert!(matches!(err, RecordError::Io { .. }));
        assert!(recorder.manifest().is_empty());
    }

    #[test]
    fn archive_member_without_hash_is_io_failure() {
        let recorder = recorder(MemoryFilesystem::new("/proj").file("/proj/lib.jar", "zip"));
        let member = ArchiveMemberPath::new("lib.jar", "Missing.class");
        let err = recorder
            .get_archive_member(&member)
            .expect_err("absent member hash");
        match err {
            RecordError::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
            other => panic!("expected Io, got {other:?}"),
        }
        assert!(recorder.manifest().is_empty());
    }

    #[test]
    fn recorder_is_a_content_hasher() {
        let recorder = recorder(MemoryFilesystem::new("/proj").file("/proj/f", "abc"));
        let as_hasher: &dyn ContentHasher = &recorder;
        assert_eq!(
            as_hasher.hash(Path::new("/proj/f")).unwrap(),
            ContentHash::of_bytes("abc")
        );
        let err = as_hasher
            .hash(Path::new("/proj/missing"))
            .expect_err("missing");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn concurrent_overlapping_lookups_record_each_path_once() {
        let fs = Arc::new(
            MemoryFilesystem::new("/proj")
                .file("/proj/src/a.h", "a")
                .file("/proj/src/b.h", "b")
                .file("/proj/src/nested/c.h", "c")
                .file("/ext/x", "x")
                .symlink("/proj/src/link", "/ext/x"),
        );
        let hasher = MemoryHasher::new(Arc::clone(&fs)).with_delay(Duration::from_millis(2));
        let recorder = Arc::new(FingerprintRecorder::new(
            hasher,
            fs,
            Arc::new(Manifest::new()),
        ));

        let inputs = ["src", "src/a.h", "src/nested", "src/b.h", "src/link", "src/nested/c.h"];
        let handles = (0..8)
            .map(|i| {
                let recorder = Arc::clone(&recorder);
                thread::spawn(move || {
                    for offset in 0..inputs.len() {
                        let path = inputs[(i + offset) % inputs.len()];
                        recorder.get(Path::new(path)).expect("recorded");
                    }
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().expect("worker thread");
        }

        let mut keys = keys(&recorder);
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(total, keys.len(), "duplicate entries: {keys:?}");
        assert_eq!(
            keys,
            vec!["src", "src/a.h", "src/b.h", "src/link", "src/nested", "src/nested/c.h"]
        );
    }
}
