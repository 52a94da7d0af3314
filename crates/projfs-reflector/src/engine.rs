//! Seams toward the native virtualization engine.
//!
//! The protocol engine never talks to ProjFS directly. Results flow back
//! through these traits, implemented by the Windows transport in
//! `virtualizer` and by recording mocks in tests.
//!
//! Command completion is implicit: every callback returns its [`Status`]
//! synchronously and the transport hands that value to the engine as the
//! completion for the command id.
//!
//! [`Status`]: crate::error::Status

use uuid::Uuid;

use crate::error::Result;
use crate::layer::FileRecord;
use crate::projection::types::PlaceholderDescriptor;

/// Engine-allocated buffer used for one file-data transfer.
///
/// Buffers obtained from [`EngineTransport::create_write_buffer`] satisfy the
/// engine's alignment requirements.
pub trait WriteBuffer: Send {
    /// Buffer contents.
    fn as_slice(&self) -> &[u8];

    /// Mutable buffer contents.
    fn as_mut_slice(&mut self) -> &mut [u8];

    /// Buffer size in bytes.
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Check if the buffer has no capacity.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write primitives exposed by the engine for one virtualization instance.
pub trait EngineTransport: Send + Sync {
    /// Sector size that file-data writes must align to.
    fn write_alignment(&self) -> Result<u32>;

    /// Allocate an aligned buffer of at least `size` bytes.
    ///
    /// # Arguments
    /// * `size` - Buffer size in bytes
    fn create_write_buffer(&self, size: usize) -> Result<Box<dyn WriteBuffer>>;

    /// Transfer `length` bytes of `buffer` into the file at `offset`.
    ///
    /// # Arguments
    /// * `data_stream_id` - Stream id from the originating request
    /// * `buffer` - Buffer returned by `create_write_buffer`
    /// * `offset` - Aligned byte offset
    /// * `length` - Aligned length
    fn write_file_data(
        &self,
        data_stream_id: Uuid,
        buffer: &dyn WriteBuffer,
        offset: u64,
        length: u32,
    ) -> Result<()>;

    /// Persist a placeholder for a path below the virtualization root.
    ///
    /// # Arguments
    /// * `relative_path` - Path relative to the virtualization root
    /// * `descriptor` - Placeholder metadata and identity tokens
    fn write_placeholder_info(
        &self,
        relative_path: &str,
        descriptor: &PlaceholderDescriptor,
    ) -> Result<()>;
}

/// Result of offering one entry to a [`DirEntrySink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkOutcome {
    /// Entry was stored.
    Accepted,
    /// No room for this entry.
    Full,
}

/// Fixed-size result buffer for one `GetDirectoryEnumeration` round.
pub trait DirEntrySink {
    /// Offer one entry.
    ///
    /// # Arguments
    /// * `record` - Entry metadata
    /// * `symlink_target` - Resolved target when the entry is a symlink
    fn add(&mut self, record: &FileRecord, symlink_target: Option<&str>) -> Result<SinkOutcome>;
}
