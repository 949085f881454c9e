//! Fingerprint manifest model.
//!
//! A [`Manifest`] is the append-only record of every input a build touched.
//! It is shared by all recording threads of one build and handed to the
//! transport layer as a [`ManifestSnapshot`] once they are done.
//!
//! The entry list and the visited set sit behind one mutex so that claiming a
//! path and writing its entry cannot interleave with another thread doing the
//! same. Threads that lose a claim wait on a condvar until the winner has
//! finished the path (for directories: the whole subtree).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::types::{ContentHash, UnixPath};

/// One recorded input.
///
/// Wire form: `{"type": "FILE", "path": "a/b.h", "hash": "...", "size": 12}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManifestEntry {
    /// Regular file, keyed by its project-relative path.
    File {
        path: UnixPath,
        hash: ContentHash,
        size: u64,
    },
    /// Directory with its structural hash and sorted immediate child names.
    Directory {
        path: UnixPath,
        hash: ContentHash,
        children: Vec<String>,
    },
    /// Outermost symlink on an input's path; replaces entries for everything
    /// beneath it.
    RootSymlink { path: UnixPath, target: UnixPath },
    /// Single member of a zip/jar archive.
    ArchiveMember {
        path: UnixPath,
        member: String,
        hash: ContentHash,
    },
}

/// Discriminant of a [`ManifestEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    File,
    Directory,
    RootSymlink,
    ArchiveMember,
}

impl ManifestEntry {
    /// Path the entry was recorded for (the archive, for archive members).
    pub fn path(&self) -> &UnixPath {
        match self {
            Self::File { path, .. }
            | Self::Directory { path, .. }
            | Self::RootSymlink { path, .. }
            | Self::ArchiveMember { path, .. } => path,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            Self::File { .. } => EntryKind::File,
            Self::Directory { .. } => EntryKind::Directory,
            Self::RootSymlink { .. } => EntryKind::RootSymlink,
            Self::ArchiveMember { .. } => EntryKind::ArchiveMember,
        }
    }

    /// Hash carried by the entry; root symlinks carry none.
    pub fn hash(&self) -> Option<&ContentHash> {
        match self {
            Self::File { hash, .. }
            | Self::Directory { hash, .. }
            | Self::ArchiveMember { hash, .. } => Some(hash),
            Self::RootSymlink { .. } => None,
        }
    }

    /// Visited-set key: the path, or `archive!/member` for archive members.
    pub fn key(&self) -> UnixPath {
        match self {
            Self::ArchiveMember { path, member, .. } => archive_member_key(path, member),
            other => other.path().clone(),
        }
    }
}

pub(crate) fn archive_member_key(archive: &UnixPath, member: &str) -> UnixPath {
    UnixPath::new(format!("{}!/{}", archive, member))
}

/// Serializable point-in-time copy of a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ManifestSnapshot {
    pub entries: Vec<ManifestEntry>,
}

impl ManifestSnapshot {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry recorded under `key`, if any.
    pub fn find(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|entry| entry.key().as_str() == key)
    }
}

/// Progress of one visited key.
#[derive(Debug, Clone)]
enum Visit {
    /// A thread owns the key and is recording it.
    Recording,
    /// Directory entry written, but recording its subtree failed part-way.
    Interrupted {
        hash: ContentHash,
        children: Vec<String>,
    },
    /// Fully recorded. Files and directories keep their hash for later
    /// lookups; root symlinks keep none since callers hash through them.
    Recorded(Option<ContentHash>),
}

/// Result of trying to claim a key.
#[derive(Debug)]
pub(crate) enum Claim {
    /// Caller owns the key and must record it, then `finish`, `interrupt`
    /// or `release` it.
    Acquired,
    /// Caller owns an interrupted directory and must re-walk its children.
    /// Its entry is already in the manifest.
    Resumed {
        hash: ContentHash,
        children: Vec<String>,
    },
    /// Already recorded, by this or another thread.
    Recorded(Option<ContentHash>),
}

#[derive(Debug, Default)]
struct ManifestState {
    entries: Vec<ManifestEntry>,
    visited: HashMap<UnixPath, Visit>,
}

/// Append-only manifest shared across recording threads.
#[derive(Debug, Default)]
pub struct Manifest {
    state: Mutex<ManifestState>,
    settled: Condvar,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManifestState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Whether `key` has been claimed, whatever its progress.
    pub fn is_visited(&self, key: &UnixPath) -> bool {
        self.lock().visited.contains_key(key)
    }

    /// Copy of the entries recorded so far, in insertion order.
    pub fn snapshot(&self) -> ManifestSnapshot {
        ManifestSnapshot {
            entries: self.lock().entries.clone(),
        }
    }

    /// Consume the manifest once every recording thread is done with it.
    pub fn into_snapshot(self) -> ManifestSnapshot {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        ManifestSnapshot {
            entries: state.entries,
        }
    }

    /// Hash of a fully recorded file or directory, without claiming.
    pub(crate) fn recorded_hash(&self, key: &UnixPath) -> Option<ContentHash> {
        match self.lock().visited.get(key) {
            Some(Visit::Recorded(hash)) => hash.clone(),
            _ => None,
        }
    }

    /// Claim `key`, blocking while another thread is recording it.
    pub(crate) fn claim(&self, key: &UnixPath) -> Claim {
        let mut state = self.lock();
        loop {
            match state.visited.get(key) {
                None => {
                    state.visited.insert(key.clone(), Visit::Recording);
                    return Claim::Acquired;
                }
                Some(Visit::Recorded(hash)) => return Claim::Recorded(hash.clone()),
                Some(Visit::Interrupted { .. }) => {
                    let Some(Visit::Interrupted { hash, children }) =
                        state.visited.insert(key.clone(), Visit::Recording)
                    else {
                        unreachable!("visit state changed while holding the lock");
                    };
                    return Claim::Resumed { hash, children };
                }
                Some(Visit::Recording) => {
                    state = self
                        .settled
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    /// Append the entry for a key the caller owns. The key stays claimed.
    pub(crate) fn append(&self, entry: ManifestEntry) {
        let mut state = self.lock();
        debug_assert!(
            matches!(state.visited.get(&entry.key()), Some(Visit::Recording)),
            "entry appended for a key that is not being recorded"
        );
        state.entries.push(entry);
    }

    /// Mark an owned key fully recorded and wake waiters.
    pub(crate) fn finish(&self, key: &UnixPath, hash: Option<ContentHash>) {
        self.settle(key, Some(Visit::Recorded(hash)));
    }

    /// Mark an owned directory as written-but-incomplete and wake waiters.
    pub(crate) fn interrupt(&self, key: &UnixPath, hash: ContentHash, children: Vec<String>) {
        self.settle(key, Some(Visit::Interrupted { hash, children }));
    }

    /// Drop the claim on a key whose entry was never written.
    pub(crate) fn release(&self, key: &UnixPath) {
        self.settle(key, None);
    }

    fn settle(&self, key: &UnixPath, visit: Option<Visit>) {
        let mut state = self.lock();
        match visit {
            Some(visit) => {
                state.visited.insert(key.clone(), visit);
            }
            None => {
                state.visited.remove(key);
            }
        }
        drop(state);
        self.settled.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn hash(s: &str) -> ContentHash {
        ContentHash::of_bytes(s)
    }

    #[test]
    fn entry_wire_format_matches_schema() {
        let entry = ManifestEntry::Directory {
            path: UnixPath::new("a/b"),
            hash: ContentHash::from_hex("abcd").unwrap(),
            children: vec!["c".to_string(), "d".to_string()],
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "DIRECTORY",
                "path": "a/b",
                "hash": "abcd",
                "children": ["c", "d"],
            })
        );

        let link = ManifestEntry::RootSymlink {
            path: UnixPath::new("link"),
            target: UnixPath::new("/ext/file"),
        };
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["type"], "ROOT_SYMLINK");
        assert_eq!(json["target"], "/ext/file");
        assert!(json.get("hash").is_none());
    }

    #[test]
    fn archive_member_key_uses_bang_separator() {
        let entry = ManifestEntry::ArchiveMember {
            path: UnixPath::new("libs/a.jar"),
            member: "com/Foo.class".to_string(),
            hash: hash("x"),
        };
        assert_eq!(entry.key().as_str(), "libs/a.jar!/com/Foo.class");
        assert_eq!(entry.path().as_str(), "libs/a.jar");
    }

    #[test]
    fn claim_then_finish_reports_recorded_hash() {
        let manifest = Manifest::new();
        let key = UnixPath::new("a");
        assert!(matches!(manifest.claim(&key), Claim::Acquired));
        manifest.append(ManifestEntry::File {
            path: key.clone(),
            hash: hash("a"),
            size: 1,
        });
        manifest.finish(&key, Some(hash("a")));

        match manifest.claim(&key) {
            Claim::Recorded(h) => assert_eq!(h, Some(hash("a"))),
            other => panic!("expected Recorded, got {other:?}"),
        }
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn released_claim_can_be_reacquired() {
        let manifest = Manifest::new();
        let key = UnixPath::new("a");
        assert!(matches!(manifest.claim(&key), Claim::Acquired));
        manifest.release(&key);
        assert!(!manifest.is_visited(&key));
        assert!(matches!(manifest.claim(&key), Claim::Acquired));
    }

    #[test]
    fn interrupted_claim_resumes_with_children() {
        let manifest = Manifest::new();
        let key = UnixPath::new("dir");
        assert!(matches!(manifest.claim(&key), Claim::Acquired));
        manifest.interrupt(&key, hash("dir"), vec!["x".to_string()]);

        match manifest.claim(&key) {
            Claim::Resumed { hash: h, children } => {
                assert_eq!(h, hash("dir"));
                assert_eq!(children, vec!["x".to_string()]);
            }
            other => panic!("expected Resumed, got {other:?}"),
        }
    }

    #[test]
    fn waiter_blocks_until_owner_finishes() {
        let manifest = Arc::new(Manifest::new());
        let key = UnixPath::new("shared.h");
        assert!(matches!(manifest.claim(&key), Claim::Acquired));

        let waiter = {
            let manifest = Arc::clone(&manifest);
            let key = key.clone();
            thread::spawn(move || manifest.claim(&key))
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished(), "waiter must block while recording");

        manifest.append(ManifestEntry::File {
            path: key.clone(),
            hash: hash("h"),
            size: 0,
        });
        manifest.finish(&key, Some(hash("h")));

        match waiter.join().unwrap() {
            Claim::Recorded(h) => assert_eq!(h, Some(hash("h"))),
            other => panic!("expected Recorded, got {other:?}"),
        }
    }

    #[test]
    fn snapshot_find_locates_entries_by_key() {
        let manifest = Manifest::new();
        let key = UnixPath::new("f");
        manifest.claim(&key);
        manifest.append(ManifestEntry::File {
            path: key.clone(),
            hash: hash("f"),
            size: 3,
        });
        manifest.finish(&key, Some(hash("f")));

        let snapshot = manifest.into_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.find("f").unwrap().kind(), EntryKind::File);
        assert!(snapshot.find("g").is_none());
    }
}
