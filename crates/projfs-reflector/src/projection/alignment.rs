//! Sector alignment for file-data transfers.
//!
//! Writes into a placeholder may use unbuffered I/O, so both the offset and
//! the length of every transfer must be multiples of the engine's sector size.

/// Ceiling for a single hydration chunk.
pub const MAX_CHUNK_SIZE: usize = 64 * 1024;

/// A byte range widened to sector boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignedRange {
    /// Offset rounded down to a sector boundary.
    pub offset: u64,
    /// Distance from `offset` to the end rounded up to a sector boundary.
    pub length: u64,
}

impl AlignedRange {
    /// Widen `[byte_offset, byte_offset + length)` to sector boundaries.
    ///
    /// A sector size of 0 is treated as 1 (no alignment).
    ///
    /// # Arguments
    /// * `byte_offset` - Requested start offset
    /// * `length` - Requested length
    /// * `sector_size` - Engine-reported alignment
    pub fn new(byte_offset: u64, length: u64, sector_size: u32) -> Self {
        let sector: u64 = u64::from(sector_size.max(1));
        let offset: u64 = byte_offset - byte_offset % sector;
        let end: u64 = round_up(byte_offset.saturating_add(length), sector);
        Self {
            offset,
            length: end - offset,
        }
    }

    /// Aligned end offset.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

fn round_up(value: u64, sector: u64) -> u64 {
    match value % sector {
        0 => value,
        rem => value.saturating_add(sector - rem),
    }
}

/// Chunk length for a transfer: the ceiling, widened to whole sectors.
///
/// # Arguments
/// * `chunk_size` - Configured chunk size
/// * `sector_size` - Engine-reported alignment
pub fn aligned_chunk_size(chunk_size: usize, sector_size: u32) -> u64 {
    AlignedRange::new(0, chunk_size.max(1) as u64, sector_size).length
}
