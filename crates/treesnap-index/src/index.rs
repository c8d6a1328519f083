//! The core Index structure: a snapshot of a tree's metadata.
//!
//! The [`Index`] manages a `BTreeMap<String, Entry>` keyed by slash-separated
//! paths relative to the tree root. The root itself is never a key. Keys
//! iterate in lexicographic order, which is also the order of every
//! [`ChangeSet`] produced by [`Index::compare`].

use std::cmp::Ordering;
use std::collections::btree_map;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::change::{Change, ChangeMeta, ChangeSet};
use crate::config::SnapshotConfig;
use crate::entry::Entry;
use crate::error::IndexResult;
use crate::snapshot;

/// Snapshot of a tree: the last known state of every tracked path.
///
/// An index is owned by a single mount session. Concurrent users must
/// serialize access through a lock held alongside it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Index {
    entries: BTreeMap<String, Entry>,
}

impl Index {
    /// Create a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index describing every file and directory below `root`.
    pub fn from_tree(root: impl AsRef<Path>) -> IndexResult<Self> {
        Self::from_tree_with(root, &SnapshotConfig::default())
    }

    /// Build an index below `root` with an explicit builder configuration.
    pub fn from_tree_with(root: impl AsRef<Path>, config: &SnapshotConfig) -> IndexResult<Self> {
        let entries = snapshot::scan(root.as_ref(), config)?;
        Ok(Self { entries })
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the index has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get an entry by path.
    pub fn get(&self, path: &str) -> Option<&Entry> {
        self.entries.get(path)
    }

    /// Get a mutable entry by path, e.g. to drive its promise.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut Entry> {
        self.entries.get_mut(path)
    }

    /// Insert or replace the entry for `path`, returning the previous one.
    pub fn insert(&mut self, path: impl Into<String>, entry: Entry) -> Option<Entry> {
        self.entries.insert(path.into(), entry)
    }

    /// Remove the entry for `path`.
    pub fn remove(&mut self, path: &str) -> Option<Entry> {
        self.entries.remove(path)
    }

    /// Merge `entry` into the entry at `path`, inserting a copy if absent.
    pub fn merge_in(&mut self, path: &str, entry: &Entry) {
        match self.entries.get_mut(path) {
            Some(existing) => existing.merge_in(entry),
            None => {
                self.entries.insert(path.to_string(), entry.clone());
            }
        }
    }

    /// Iterate over entries in path order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Entry> {
        self.entries.iter()
    }

    /// Iterate over tracked paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Sum of recorded sizes.
    pub fn total_size(&self) -> u64 {
        self.entries.values().map(|e| e.file.size).sum()
    }

    // ---------------------------------------------------------------
    // Change detection
    // ---------------------------------------------------------------

    /// Compare the index with the live tree at `root`.
    ///
    /// The result is sorted by path. Nothing is emitted for paths whose
    /// recorded metadata matches the file system.
    pub fn compare(&self, root: impl AsRef<Path>) -> IndexResult<ChangeSet> {
        self.compare_with(root, &SnapshotConfig::default())
    }

    /// Like [`Index::compare`] with an explicit builder configuration.
    pub fn compare_with(
        &self,
        root: impl AsRef<Path>,
        config: &SnapshotConfig,
    ) -> IndexResult<ChangeSet> {
        let root = root.as_ref();
        let started = Instant::now();

        let live = snapshot::scan(root, config)?;
        let changes = diff_entries(&self.entries, &live);

        debug!(
            root = %root.display(),
            tracked = self.entries.len(),
            live = live.len(),
            changes = changes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "compared index with tree"
        );
        Ok(ChangeSet::from_sorted(changes))
    }

    /// Fold `changes` into the index without rescanning the whole tree.
    ///
    /// Added and updated paths are stat'ed again, removed paths are dropped.
    /// A path that vanished since the comparison is dropped as well. The file
    /// system itself is never modified. `changes` must come from a
    /// [`Index::compare`] of this index against the same root.
    pub fn apply(&mut self, root: impl AsRef<Path>, changes: &[Change]) -> IndexResult<()> {
        let root = root.as_ref();

        for change in changes {
            trace!(change = %change, "applying change");
            match change.meta {
                ChangeMeta::Add | ChangeMeta::Update => {
                    let path = snapshot::native_path(root, &change.name);
                    match Entry::from_path(&path) {
                        Ok(fresh) => self.refresh(&change.name, fresh),
                        Err(err) if err.is_not_found() => {
                            debug!(path = %change.name, "path vanished before apply");
                            self.entries.remove(&change.name);
                        }
                        Err(err) => return Err(err),
                    }
                }
                ChangeMeta::Remove => {
                    self.entries.remove(&change.name);
                }
            }
        }

        debug!(root = %root.display(), applied = changes.len(), entries = self.entries.len(), "applied changes");
        Ok(())
    }

    /// Replace the file attributes at `name`, keeping VFS state.
    fn refresh(&mut self, name: &str, fresh: Entry) {
        match self.entries.get_mut(name) {
            Some(existing) => existing.file = fresh.file,
            None => {
                self.entries.insert(name.to_string(), fresh);
            }
        }
    }

    // ---------------------------------------------------------------
    // Cost estimation
    // ---------------------------------------------------------------

    /// Count entries whose recorded size is strictly below `max_size`.
    ///
    /// A negative `max_size` counts every entry regardless of size, so
    /// `count(0)` is always zero while `count(-1)` is [`Index::len`].
    pub fn count(&self, max_size: i64) -> usize {
        match u64::try_from(max_size) {
            Ok(limit) => self.entries.values().filter(|e| e.file.size < limit).count(),
            Err(_) => self.entries.len(),
        }
    }
}

impl<'a> IntoIterator for &'a Index {
    type Item = (&'a String, &'a Entry);
    type IntoIter = btree_map::Iter<'a, String, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(String, Entry)> for Index {
    fn from_iter<I: IntoIterator<Item = (String, Entry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Merge-join two path-ordered maps into a path-ordered change list.
fn diff_entries(stored: &BTreeMap<String, Entry>, live: &BTreeMap<String, Entry>) -> Vec<Change> {
    let mut changes = Vec::new();
    let mut old = stored.iter().peekable();
    let mut new = live.iter().peekable();

    loop {
        let order = match (old.peek(), new.peek()) {
            (Some((o, _)), Some((n, _))) => o.cmp(n),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };

        match order {
            Ordering::Less => {
                if let Some((name, _)) = old.next() {
                    changes.push(Change::new(name.clone(), 0, ChangeMeta::Remove));
                }
            }
            Ordering::Greater => {
                if let Some((name, entry)) = new.next() {
                    let size = if entry.is_dir() { 0 } else { entry.file.size };
                    changes.push(Change::new(name.clone(), size, ChangeMeta::Add));
                }
            }
            Ordering::Equal => {
                if let (Some((name, recorded)), Some((_, current))) = (old.next(), new.next()) {
                    if recorded.file != current.file {
                        changes.push(Change::new(name.clone(), 0, ChangeMeta::Update));
                    }
                }
            }
        }
    }

    changes
}
