//! JSON persistence of an index.
//!
//! The document maps every tracked path to its file attributes:
//!
//! ```text
//! { "<path>": { "c": ctime_ns, "m": mtime_ns, "s": size, "o": mode }, ... }
//! ```
//!
//! VFS state is not part of the document. A loaded index starts with zeroed
//! inodes, reference counts and promises.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::index::Index;

impl Index {
    /// Encode the index as a JSON document.
    pub fn to_json(&self) -> IndexResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode an index from a JSON document.
    pub fn from_json(data: &[u8]) -> IndexResult<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Write the index to `path`, atomically replacing any previous file.
    pub fn save(&self, path: impl AsRef<Path>) -> IndexResult<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| IndexError::io(dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, self)?;
            writer.flush().map_err(|e| IndexError::io(path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| IndexError::io(path, e))?;
        tmp.persist(path).map_err(|e| IndexError::io(path, e.error))?;

        debug!(path = %path.display(), entries = self.len(), "index saved");
        Ok(())
    }

    /// Read an index previously written by [`Index::save`].
    pub fn load(path: impl AsRef<Path>) -> IndexResult<Self> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| IndexError::io(path, e))?;
        let index: Self = serde_json::from_reader(BufReader::new(file))?;

        debug!(path = %path.display(), entries = index.len(), "index loaded");
        Ok(index)
    }
}
