//! Placeholder metadata and on-demand file content.

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use crate::engine::{EngineTransport, WriteBuffer};
use crate::error::{ProviderError, Result};
use crate::layer::{FileRecord, LayerFile, LayerStore};
use crate::options::ProviderOptions;
use crate::projection::alignment::{aligned_chunk_size, AlignedRange, MAX_CHUNK_SIZE};
use crate::projection::types::{FileDataRequest, PlaceholderDescriptor};
use crate::util::path::{is_rooted, join, relative_to_root, split_parent, strip_root};
use crate::util::prj_file_name_match;

/// Answers metadata and content requests from the layer.
///
/// Holds no per-request state; every method may run concurrently.
pub struct HydrationPipeline {
    layer: Arc<dyn LayerStore>,
    chunk_size: usize,
    content_id: Arc<[u8]>,
    provider_id: Arc<[u8]>,
}

impl HydrationPipeline {
    /// Create a pipeline over a layer.
    ///
    /// # Arguments
    /// * `layer` - Backing store
    /// * `options` - Chunk size and placeholder ids are taken from here
    pub fn new(layer: Arc<dyn LayerStore>, options: &ProviderOptions) -> Self {
        Self {
            layer,
            chunk_size: options.chunk_size.clamp(1, MAX_CHUNK_SIZE),
            content_id: Arc::from(options.content_id.as_slice()),
            provider_id: Arc::from(options.provider_id.as_slice()),
        }
    }

    /// Find the layer entry for a path by ProjFS name matching within its
    /// parent directory.
    ///
    /// # Arguments
    /// * `relative_path` - Path relative to the virtualization root
    ///
    /// # Returns
    /// The matching record, or `NotFound`.
    pub fn lookup(&self, relative_path: &str) -> Result<FileRecord> {
        let (parent, name) = split_parent(relative_path);
        if name.is_empty() {
            return Err(ProviderError::not_found(relative_path));
        }

        let records: Vec<FileRecord> = match self.layer.list_directory(parent) {
            Ok(records) => records,
            Err(ProviderError::NotFound { .. }) => {
                return Err(ProviderError::not_found(relative_path))
            }
            Err(e) => return Err(e),
        };

        records
            .into_iter()
            .find(|record| prj_file_name_match(&record.name, name))
            .ok_or_else(|| ProviderError::not_found(relative_path))
    }

    /// Build the placeholder descriptor for a path.
    ///
    /// # Arguments
    /// * `relative_path` - Path relative to the virtualization root
    pub fn get_placeholder_info(&self, relative_path: &str) -> Result<PlaceholderDescriptor> {
        let record: FileRecord = self.lookup(relative_path)?;
        self.describe(split_parent(relative_path).0, record)
    }

    /// Look up a path and persist its placeholder through the engine.
    ///
    /// The placeholder is written under the layer's stored name, so the
    /// on-disk casing follows the layer.
    ///
    /// # Arguments
    /// * `engine` - Engine write primitives
    /// * `relative_path` - Path relative to the virtualization root
    pub fn write_placeholder(&self, engine: &dyn EngineTransport, relative_path: &str) -> Result<()> {
        let descriptor: PlaceholderDescriptor = self.get_placeholder_info(relative_path)?;
        let (parent, _) = split_parent(relative_path);
        let placeholder_path: String = join(parent, &descriptor.record.name);

        tracing::debug!(
            path = %placeholder_path,
            is_directory = descriptor.record.is_directory,
            symlink = ?descriptor.symlink_target,
            "writing placeholder"
        );
        engine.write_placeholder_info(&placeholder_path, &descriptor)
    }

    /// Check whether a path exists in the layer.
    ///
    /// # Arguments
    /// * `relative_path` - Path relative to the virtualization root
    pub fn query_file_name(&self, relative_path: &str) -> Result<()> {
        self.lookup(relative_path).map(|_| ())
    }

    /// Read a symlink target and rewrite a rooted target relative to the
    /// layer root.
    ///
    /// # Arguments
    /// * `relative_path` - Link path relative to the layer root
    ///
    /// # Returns
    /// The target to hand to the engine.
    pub fn resolve_symlink_target(&self, relative_path: &str) -> Result<String> {
        let target: String = self.layer.resolve_symlink_target(relative_path)?;
        if !is_rooted(&target) {
            return Ok(target);
        }

        let rooted: &Path = Path::new(&target);
        let root: &Path = self.layer.root();
        strip_root(root, rooted)
            .or_else(|| {
                self.layer
                    .canonical_root()
                    .and_then(|canonical| strip_root(canonical, rooted))
            })
            .or_else(|| relative_to_root(root, rooted))
            .ok_or_else(|| {
                ProviderError::Internal(format!(
                    "symlink {relative_path} targets {target}, which shares no root with the layer"
                ))
            })
    }

    /// Stream a byte range of a layer file into the engine.
    ///
    /// The range is widened to the engine's sector alignment and clipped to
    /// the file length, then copied in chunks through a single engine buffer.
    /// `check_cancelled` runs before every chunk and stops the transfer with
    /// its error.
    ///
    /// # Arguments
    /// * `engine` - Engine write primitives
    /// * `request` - Range and stream id from the engine
    /// * `check_cancelled` - Cancellation probe
    pub fn get_file_data(
        &self,
        engine: &dyn EngineTransport,
        request: &FileDataRequest<'_>,
        check_cancelled: &dyn Fn() -> Result<()>,
    ) -> Result<()> {
        let LayerFile { mut reader, len } = self.layer.open_file(request.relative_path)?;

        let sector: u32 = engine.write_alignment()?;
        let range = AlignedRange::new(request.byte_offset, u64::from(request.length), sector);
        let end: u64 = range.end().min(len);
        if range.offset >= end {
            tracing::debug!(path = %request.relative_path, len, "requested range is past end of file");
            return Ok(());
        }

        let chunk: u64 = aligned_chunk_size(self.chunk_size, sector).min(range.length);
        let chunk: usize = usize::try_from(chunk)
            .map_err(|_| ProviderError::Internal(format!("chunk of {chunk} bytes")))?;
        let mut buffer: Box<dyn WriteBuffer> = engine.create_write_buffer(chunk)?;
        if buffer.len() < chunk {
            return Err(ProviderError::OutOfMemory { size: chunk });
        }

        reader
            .seek(SeekFrom::Start(range.offset))
            .map_err(|e| ProviderError::io_error(request.relative_path, e))?;

        let mut position: u64 = range.offset;
        while position < end {
            check_cancelled()?;

            let to_copy: usize = (end - position).min(chunk as u64) as usize;
            let slice: &mut [u8] = &mut buffer.as_mut_slice()[..to_copy];
            let read: usize = fill(&mut reader, slice)
                .map_err(|e| ProviderError::io_error(request.relative_path, e))?;
            if read != to_copy {
                return Err(ProviderError::ShortRead {
                    path: request.relative_path.to_string(),
                    offset: position,
                    expected: to_copy,
                    actual: read,
                });
            }

            engine.write_file_data(request.data_stream_id, &*buffer, position, to_copy as u32)?;
            position += to_copy as u64;
        }

        tracing::debug!(
            path = %request.relative_path,
            offset = range.offset,
            bytes = end - range.offset,
            "hydrated file range"
        );
        Ok(())
    }

    fn describe(&self, parent: &str, record: FileRecord) -> Result<PlaceholderDescriptor> {
        let symlink_target: Option<String> = if record.is_reparse_point() {
            Some(self.resolve_symlink_target(&join(parent, &record.name))?)
        } else {
            None
        };

        Ok(PlaceholderDescriptor {
            record,
            content_id: Arc::clone(&self.content_id),
            provider_id: Arc::clone(&self.provider_id),
            symlink_target,
        })
    }
}

/// Read until `buf` is full or the stream ends.
///
/// # Returns
/// Bytes read.
fn fill(reader: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled: usize = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
