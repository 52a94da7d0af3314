//! Backing store ("layer") access.
//!
//! The layer is the source of truth for projected content. The provider only
//! reads from it; every path handed to a [`LayerStore`] is relative to the
//! layer root, and the empty path names the root itself.

mod fs;
mod record;

use std::io::{Read, Seek};
use std::path::Path;

pub use fs::FsLayer;
pub use record::{FileAttributes, FileRecord, FileTimes};

use crate::error::Result;

/// Readable, seekable content stream for one layer file.
pub trait LayerReader: Read + Seek + Send {}

impl<T: Read + Seek + Send> LayerReader for T {}

/// An open layer file.
pub struct LayerFile {
    /// Content stream positioned at offset 0.
    pub reader: Box<dyn LayerReader>,
    /// File length in bytes at open time.
    pub len: u64,
}

impl std::fmt::Debug for LayerFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerFile").field("len", &self.len).finish()
    }
}

/// Read access to the backing store.
///
/// Implementations must be safe to call from any engine worker thread.
pub trait LayerStore: Send + Sync {
    /// Absolute path of the layer root.
    ///
    /// Used to rewrite rooted symlink targets.
    fn root(&self) -> &Path;

    /// Root with links resolved, when it differs from [`root`](Self::root).
    fn canonical_root(&self) -> Option<&Path> {
        None
    }

    /// List one directory level.
    ///
    /// # Arguments
    /// * `relative_path` - Directory relative to the layer root
    ///
    /// # Returns
    /// Entries in the layer's own listing order, or `NotFound` if the
    /// directory does not exist.
    fn list_directory(&self, relative_path: &str) -> Result<Vec<FileRecord>>;

    /// Open a regular file for reading.
    ///
    /// # Arguments
    /// * `relative_path` - File relative to the layer root
    fn open_file(&self, relative_path: &str) -> Result<LayerFile>;

    /// Read the stored target of a symbolic link.
    ///
    /// # Arguments
    /// * `relative_path` - Link relative to the layer root
    ///
    /// # Returns
    /// The target exactly as stored (rooted or relative).
    fn resolve_symlink_target(&self, relative_path: &str) -> Result<String>;
}
