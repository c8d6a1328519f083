//! Tree snapshot index for remote-mount synchronization.
//!
//! Keeps a point-in-time snapshot of a directory tree's metadata, detects
//! which paths were added, updated or removed since, and folds those changes
//! back into the snapshot without rescanning the tree.
//!
//! # Key Types
//!
//! - [`Index`] -- Path-ordered snapshot (BTreeMap-backed)
//! - [`Entry`] -- Tracked path: durable [`File`] half plus VFS [`Virtual`] half
//! - [`Promise`] -- Local materialization lifecycle flags
//! - [`Change`] / [`ChangeSet`] -- Result of [`Index::compare`]
//! - [`SnapshotConfig`] -- Parallel snapshot builder settings

pub mod change;
pub mod config;
pub mod entry;
pub mod error;
pub mod index;
mod persist;
pub mod promise;
mod snapshot;

#[cfg(test)]
mod fixture;

pub use change::{Change, ChangeMeta, ChangeSet};
pub use config::SnapshotConfig;
pub use entry::{Entry, File, Virtual};
pub use error::{IndexError, IndexResult};
pub use index::Index;
pub use promise::Promise;
