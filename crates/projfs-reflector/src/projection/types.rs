//! Data types handed to the engine for placeholders.

use std::sync::Arc;

use uuid::Uuid;

use crate::layer::FileRecord;

/// Maximum length of a content or provider id (PRJ_PLACEHOLDER_ID_LENGTH).
pub const PLACEHOLDER_ID_LENGTH: usize = 128;

/// Metadata for one placeholder.
///
/// Built fresh per lookup; the engine, not the provider, persists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderDescriptor {
    /// Entry metadata from the layer.
    pub record: FileRecord,
    /// Staleness token for the content.
    pub content_id: Arc<[u8]>,
    /// Staleness token for the provider.
    pub provider_id: Arc<[u8]>,
    /// Symlink target, already rewritten for the virtualization root.
    pub symlink_target: Option<String>,
}

impl PlaceholderDescriptor {
    /// Check if this placeholder describes a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.symlink_target.is_some()
    }
}

/// One `GetFileData` request from the engine.
#[derive(Debug, Clone, Copy)]
pub struct FileDataRequest<'a> {
    /// Path relative to the virtualization root.
    pub relative_path: &'a str,
    /// Requested start offset.
    pub byte_offset: u64,
    /// Requested length.
    pub length: u32,
    /// Stream to write into.
    pub data_stream_id: Uuid,
    /// Content id stored on the placeholder.
    pub content_id: &'a [u8],
    /// Provider id stored on the placeholder.
    pub provider_id: &'a [u8],
}
