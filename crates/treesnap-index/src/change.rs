//! Change records produced by comparing an index against a live tree.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// The kind of change detected for a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeMeta {
    /// Present in the tree, unknown to the index.
    Add,
    /// Known to the index with different recorded metadata.
    Update,
    /// Known to the index, gone from the tree.
    Remove,
}

impl fmt::Display for ChangeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
        })
    }
}

/// A single change for one path.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Change {
    /// Slash-separated path relative to the tree root.
    pub name: String,
    /// Size of an added file; zero for directories and other kinds.
    pub size: u64,
    /// What happened to the path.
    pub meta: ChangeMeta,
}

impl Change {
    /// Create a new change.
    pub fn new(name: impl Into<String>, size: u64, meta: ChangeMeta) -> Self {
        Self {
            name: name.into(),
            size,
            meta,
        }
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.meta, self.name)?;
        if self.meta == ChangeMeta::Add && self.size != 0 {
            write!(f, " ({} B)", self.size)?;
        }
        Ok(())
    }
}

/// Changes sorted ascending by name.
///
/// Parents always precede their descendants, so processing in order creates
/// directories before their children.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Create an empty change set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a change set from arbitrary changes, sorting them by name.
    pub fn from_unsorted(mut changes: Vec<Change>) -> Self {
        changes.sort_by(|a, b| a.name.cmp(&b.name));
        Self { changes }
    }

    /// Wrap changes that are already sorted by name.
    pub(crate) fn from_sorted(changes: Vec<Change>) -> Self {
        debug_assert!(changes.windows(2).all(|w| w[0].name < w[1].name));
        Self { changes }
    }

    /// Number of added paths.
    pub fn additions(&self) -> usize {
        self.count_meta(ChangeMeta::Add)
    }

    /// Number of updated paths.
    pub fn updates(&self) -> usize {
        self.count_meta(ChangeMeta::Update)
    }

    /// Number of removed paths.
    pub fn removals(&self) -> usize {
        self.count_meta(ChangeMeta::Remove)
    }

    /// Total bytes of added paths.
    pub fn transfer_size(&self) -> u64 {
        self.changes
            .iter()
            .filter(|c| c.meta == ChangeMeta::Add)
            .map(|c| c.size)
            .sum()
    }

    /// Unwrap into the sorted vector.
    pub fn into_vec(self) -> Vec<Change> {
        self.changes
    }

    fn count_meta(&self, meta: ChangeMeta) -> usize {
        self.changes.iter().filter(|c| c.meta == meta).count()
    }
}

impl Deref for ChangeSet {
    type Target = [Change];

    fn deref(&self) -> &[Change] {
        &self.changes
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

impl<'a> IntoIterator for &'a ChangeSet {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.iter()
    }
}
