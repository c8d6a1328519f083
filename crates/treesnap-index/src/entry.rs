//! Index entry types for tracking tree paths.
//!
//! An [`Entry`] is split in two halves: [`File`] holds the on-disk attributes
//! that survive serialization, [`Virtual`] holds process-local state owned by
//! the virtual file system and is never written out.

use std::fmt;
use std::fs::{self, Metadata};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::promise::Promise;

/// File type mask of a Unix mode.
const S_IFMT: u32 = 0o170_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFREG: u32 = 0o100_000;
const S_IFLNK: u32 = 0o120_000;

/// File attributes independent of the underlying file system.
///
/// These fields can be stored on disk and transferred over the network.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct File {
    /// Metadata change time, nanoseconds since the epoch.
    #[serde(rename = "c")]
    pub ctime: i64,
    /// Data modification time, nanoseconds since the epoch.
    #[serde(rename = "m")]
    pub mtime: i64,
    /// Size in bytes.
    #[serde(rename = "s")]
    pub size: u64,
    /// File type and permission bits.
    #[serde(rename = "o")]
    pub mode: u32,
}

/// VFS bookkeeping, lost on serialization and rebuilt by whoever mounts
/// the entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Virtual {
    /// Inode number of the mounted file.
    pub inode: u64,
    /// Number of open handles.
    pub ref_count: i32,
    /// Local materialization state.
    pub promise: Promise,
}

/// A single path registered in the index.
///
/// Only [`File`] is serialized; an entry decodes with a zeroed [`Virtual`].
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entry {
    pub file: File,
    #[serde(skip)]
    pub vfs: Virtual,
}

impl Entry {
    /// Create an entry of the given size and mode with both timestamps set
    /// to the current instant. VFS fields are zero.
    pub fn new(size: u64, mode: u32) -> Self {
        let now = unix_nanos(SystemTime::now());
        Self::with_times(now, now, size, mode)
    }

    /// Create an entry with explicit change and modification times.
    pub fn with_times(ctime: i64, mtime: i64, size: u64, mode: u32) -> Self {
        Self {
            file: File {
                ctime,
                mtime,
                size,
                mode,
            },
            vfs: Virtual::default(),
        }
    }

    /// Create an entry from a stat result.
    ///
    /// Change time is zero where the platform does not report it.
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self::with_times(ctime(meta), mtime(meta), meta.len(), mode(meta))
    }

    /// Stat `path` without following symlinks and describe the result.
    pub fn from_path(path: impl AsRef<Path>) -> IndexResult<Self> {
        let path = path.as_ref();
        let meta = fs::symlink_metadata(path).map_err(|e| IndexError::io(path, e))?;
        Ok(Self::from_metadata(&meta))
    }

    /// Returns `true` if the recorded mode describes a directory.
    pub fn is_dir(&self) -> bool {
        self.file.mode & S_IFMT == S_IFDIR
    }

    /// Overwrite this entry's fields with the non-zero fields of `other`.
    ///
    /// Only descriptive metadata is merged: `ref_count` and `promise` are
    /// lifecycle state and stay untouched.
    pub fn merge_in(&mut self, other: &Entry) {
        let f = &other.file;
        if f.ctime != 0 {
            self.file.ctime = f.ctime;
        }
        if f.mtime != 0 {
            self.file.mtime = f.mtime;
        }
        if f.size != 0 {
            self.file.size = f.size;
        }
        if f.mode != 0 {
            self.file.mode = f.mode;
        }

        if other.vfs.inode != 0 {
            self.vfs.inode = other.vfs.inode;
        }
    }
}

/// Copies never share open handles: the clone starts with `ref_count == 0`.
impl Clone for Entry {
    fn clone(&self) -> Self {
        Self {
            file: self.file,
            vfs: Virtual {
                ref_count: 0,
                ..self.vfs
            },
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[INODE {}, REFS {}, PROMISE {}][CTIME {}, MTIME {}, SIZE {}, MODE {}]",
            self.vfs.inode,
            self.vfs.ref_count,
            self.vfs.promise,
            stamp(self.file.ctime),
            stamp(self.file.mtime),
            self.file.size,
            symbolic_mode(self.file.mode),
        )
    }
}

/// Millisecond timestamp in the classic `Jan _2 15:04:05.000` layout.
fn stamp(nanos: i64) -> String {
    DateTime::<Utc>::from_timestamp_nanos(nanos)
        .format("%b %e %H:%M:%S%.3f")
        .to_string()
}

/// `ls`-style rendering such as `drwxr-xr-x`.
fn symbolic_mode(mode: u32) -> String {
    let kind = match mode & S_IFMT {
        S_IFDIR => 'd',
        S_IFLNK => 'L',
        S_IFREG | 0 => '-',
        _ => '?',
    };

    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

fn unix_nanos(t: SystemTime) -> i64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(unix)]
fn ctime(meta: &Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.ctime()
        .saturating_mul(1_000_000_000)
        .saturating_add(meta.ctime_nsec())
}

#[cfg(not(unix))]
fn ctime(_meta: &Metadata) -> i64 {
    0
}

#[cfg(unix)]
fn mtime(meta: &Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.mtime()
        .saturating_mul(1_000_000_000)
        .saturating_add(meta.mtime_nsec())
}

#[cfg(not(unix))]
fn mtime(meta: &Metadata) -> i64 {
    meta.modified().map(unix_nanos).unwrap_or(0)
}

#[cfg(unix)]
fn mode(meta: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

#[cfg(not(unix))]
fn mode(meta: &Metadata) -> u32 {
    let ft = meta.file_type();
    let (kind, perm) = if ft.is_dir() {
        (S_IFDIR, 0o755)
    } else if ft.is_symlink() {
        (S_IFLNK, 0o777)
    } else {
        (S_IFREG, 0o644)
    };

    if meta.permissions().readonly() {
        kind | (perm & 0o555)
    } else {
        kind | perm
    }
}
