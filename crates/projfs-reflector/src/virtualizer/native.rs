//! [`EngineTransport`] and [`DirEntrySink`] over the ProjFS API.

use std::ffi::c_void;

use uuid::Uuid;
use windows::core::{GUID, HRESULT, PCWSTR};
use windows::Win32::Foundation::{BOOLEAN, ERROR_INSUFFICIENT_BUFFER};
use windows::Win32::Storage::ProjectedFileSystem::{
    PrjAllocateAlignedBuffer, PrjFillDirEntryBuffer2, PrjFreeAlignedBuffer,
    PrjGetVirtualizationInstanceInfo, PrjWriteFileData, PrjWritePlaceholderInfo2,
    PRJ_DIR_ENTRY_BUFFER_HANDLE, PRJ_EXTENDED_INFO, PRJ_EXTENDED_INFO_0, PRJ_EXTENDED_INFO_0_0,
    PRJ_EXT_INFO_TYPE_SYMLINK, PRJ_FILE_BASIC_INFO, PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT,
    PRJ_PLACEHOLDER_INFO, PRJ_PLACEHOLDER_VERSION_INFO, PRJ_VIRTUALIZATION_INSTANCE_INFO,
};

use crate::engine::{DirEntrySink, EngineTransport, SinkOutcome, WriteBuffer};
use crate::error::{ProviderError, Result};
use crate::layer::FileRecord;
use crate::projection::{PlaceholderDescriptor, PLACEHOLDER_ID_LENGTH};
use crate::util::systemtime_to_filetime;
use crate::util::wstr::string_to_wide;
use crate::virtualizer::sendable::SendableContext;

/// Convert a `uuid::Uuid` to a Win32 GUID.
pub fn uuid_to_guid(id: Uuid) -> GUID {
    GUID::from_u128(id.as_u128())
}

/// Convert a Win32 GUID to a `uuid::Uuid`.
pub fn guid_to_uuid(guid: &GUID) -> Uuid {
    Uuid::from_u128(guid.to_u128())
}

fn engine_error(operation: &'static str) -> impl Fn(windows::core::Error) -> ProviderError {
    move |e| ProviderError::Engine {
        operation,
        code: e.code().0,
    }
}

/// Buffer from `PrjAllocateAlignedBuffer`, freed on drop.
struct AlignedBuffer {
    ptr: *mut c_void,
    len: usize,
}

// The buffer is plain memory owned exclusively by this value.
unsafe impl Send for AlignedBuffer {}

impl WriteBuffer for AlignedBuffer {
    fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr as *const u8, self.len) }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr as *mut u8, self.len) }
    }
}

impl Drop for AlignedBuffer {
    fn drop(&mut self) {
        unsafe { PrjFreeAlignedBuffer(self.ptr) };
    }
}

/// Engine primitives for the instance that issued a callback.
pub struct NativeEngine {
    context: SendableContext,
}

impl NativeEngine {
    /// Wrap the namespace context of a callback.
    ///
    /// # Arguments
    /// * `context` - `NamespaceVirtualizationContext` from `PRJ_CALLBACK_DATA`
    pub fn new(context: PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT) -> Self {
        Self {
            context: SendableContext::new(context),
        }
    }
}

impl EngineTransport for NativeEngine {
    fn write_alignment(&self) -> Result<u32> {
        let mut info = PRJ_VIRTUALIZATION_INSTANCE_INFO::default();
        unsafe {
            PrjGetVirtualizationInstanceInfo(self.context.inner(), &mut info)
                .map_err(engine_error("PrjGetVirtualizationInstanceInfo"))?;
        }
        Ok(info.WriteAlignment)
    }

    fn create_write_buffer(&self, size: usize) -> Result<Box<dyn WriteBuffer>> {
        let ptr: *mut c_void = unsafe { PrjAllocateAlignedBuffer(self.context.inner(), size) };
        if ptr.is_null() {
            return Err(ProviderError::OutOfMemory { size });
        }
        Ok(Box::new(AlignedBuffer { ptr, len: size }))
    }

    fn write_file_data(
        &self,
        data_stream_id: Uuid,
        buffer: &dyn WriteBuffer,
        offset: u64,
        length: u32,
    ) -> Result<()> {
        let stream: GUID = uuid_to_guid(data_stream_id);
        unsafe {
            PrjWriteFileData(
                self.context.inner(),
                &stream,
                buffer.as_slice().as_ptr() as *const c_void,
                offset,
                length,
            )
            .map_err(engine_error("PrjWriteFileData"))
        }
    }

    fn write_placeholder_info(
        &self,
        relative_path: &str,
        descriptor: &PlaceholderDescriptor,
    ) -> Result<()> {
        let path_wide = string_to_wide(relative_path);
        let target_wide = descriptor.symlink_target.as_deref().map(string_to_wide);

        let mut version_info = PRJ_PLACEHOLDER_VERSION_INFO::default();
        copy_id(&mut version_info.ContentID, &descriptor.content_id);
        copy_id(&mut version_info.ProviderID, &descriptor.provider_id);

        let placeholder_info = PRJ_PLACEHOLDER_INFO {
            FileBasicInfo: basic_info(&descriptor.record),
            VersionInfo: version_info,
            ..Default::default()
        };
        let extended: Option<PRJ_EXTENDED_INFO> =
            target_wide.as_ref().map(|wide| symlink_info(wide.as_ptr()));

        unsafe {
            PrjWritePlaceholderInfo2(
                self.context.inner(),
                PCWSTR::from_raw(path_wide.as_ptr()),
                &placeholder_info,
                std::mem::size_of::<PRJ_PLACEHOLDER_INFO>() as u32,
                extended.as_ref().map(|info| info as *const PRJ_EXTENDED_INFO),
            )
            .map_err(engine_error("PrjWritePlaceholderInfo2"))
        }
    }
}

/// Result buffer of one `GetDirectoryEnumeration` callback.
pub struct NativeDirEntryBuffer {
    handle: PRJ_DIR_ENTRY_BUFFER_HANDLE,
}

impl NativeDirEntryBuffer {
    /// Wrap the engine's buffer handle.
    pub fn new(handle: PRJ_DIR_ENTRY_BUFFER_HANDLE) -> Self {
        Self { handle }
    }
}

impl DirEntrySink for NativeDirEntryBuffer {
    fn add(&mut self, record: &FileRecord, symlink_target: Option<&str>) -> Result<SinkOutcome> {
        let name_wide = string_to_wide(&record.name);
        let target_wide = symlink_target.map(string_to_wide);
        let info: PRJ_FILE_BASIC_INFO = basic_info(record);
        let extended: Option<PRJ_EXTENDED_INFO> =
            target_wide.as_ref().map(|wide| symlink_info(wide.as_ptr()));

        let result = unsafe {
            PrjFillDirEntryBuffer2(
                self.handle,
                PCWSTR::from_raw(name_wide.as_ptr()),
                Some(&info),
                extended.as_ref().map(|info| info as *const PRJ_EXTENDED_INFO),
            )
        };

        match result {
            Ok(()) => Ok(SinkOutcome::Accepted),
            Err(e) if e.code() == HRESULT::from(ERROR_INSUFFICIENT_BUFFER) => Ok(SinkOutcome::Full),
            Err(e) => Err(engine_error("PrjFillDirEntryBuffer2")(e)),
        }
    }
}

fn basic_info(record: &FileRecord) -> PRJ_FILE_BASIC_INFO {
    PRJ_FILE_BASIC_INFO {
        IsDirectory: BOOLEAN(u8::from(record.is_directory)),
        FileSize: record.size as i64,
        CreationTime: systemtime_to_filetime(record.times.creation),
        LastAccessTime: systemtime_to_filetime(record.times.last_access),
        LastWriteTime: systemtime_to_filetime(record.times.last_write),
        ChangeTime: systemtime_to_filetime(record.times.change),
        FileAttributes: record.attributes.bits(),
    }
}

/// Extended info naming a symlink target; `target` must outlive the use.
fn symlink_info(target: *const u16) -> PRJ_EXTENDED_INFO {
    PRJ_EXTENDED_INFO {
        InfoType: PRJ_EXT_INFO_TYPE_SYMLINK,
        NextInfoOffset: 0,
        Anonymous: PRJ_EXTENDED_INFO_0 {
            Symlink: PRJ_EXTENDED_INFO_0_0 {
                TargetName: PCWSTR::from_raw(target),
            },
        },
    }
}

fn copy_id(slot: &mut [u8; PLACEHOLDER_ID_LENGTH], id: &[u8]) {
    let len: usize = id.len().min(PLACEHOLDER_ID_LENGTH);
    slot[..len].copy_from_slice(&id[..len]);
}
