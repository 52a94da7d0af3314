//! `extern "system"` callbacks invoked by the ProjFS driver.
//!
//! Each callback decodes its raw arguments, looks up the provider by the
//! registry id carried in `InstanceContext`, and maps the returned
//! [`Status`] back to an HRESULT. Panics are caught here so none unwinds
//! into the driver.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};

use windows::core::{GUID, HRESULT, PCWSTR};
use windows::Win32::Foundation::{
    BOOLEAN, ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_INSUFFICIENT_BUFFER,
    ERROR_INTERNAL_ERROR, ERROR_NOT_SUPPORTED, E_OUTOFMEMORY, S_OK,
};
use windows::Win32::Storage::ProjectedFileSystem::{
    PRJ_CALLBACKS, PRJ_CALLBACK_DATA, PRJ_CB_DATA_FLAG_ENUM_RESTART_SCAN,
    PRJ_DIR_ENTRY_BUFFER_HANDLE, PRJ_NOTIFICATION, PRJ_NOTIFICATION_PARAMETERS, PRJ_NOTIFY_TYPES,
};

use crate::callbacks::{InstanceRegistry, ProcessInfo, ProjectionCallbacks, RequestInfo};
use crate::error::Status;
use crate::notification::{NotificationEvent, NotificationKind};
use crate::projection::FileDataRequest;
use crate::util::wstr::pcwstr_to_string;
use crate::virtualizer::native::{guid_to_uuid, NativeDirEntryBuffer, NativeEngine};

/// Providers reachable from callbacks, keyed by the id in `InstanceContext`.
pub(crate) static INSTANCES: LazyLock<InstanceRegistry<dyn ProjectionCallbacks>> =
    LazyLock::new(InstanceRegistry::new);

/// Map a callback status to the HRESULT the driver expects.
pub fn status_to_hresult(status: Status) -> HRESULT {
    match status {
        Status::Ok => S_OK,
        Status::NotFound => HRESULT::from(ERROR_FILE_NOT_FOUND),
        Status::InsufficientBuffer => HRESULT::from(ERROR_INSUFFICIENT_BUFFER),
        Status::InternalError => HRESULT::from(ERROR_INTERNAL_ERROR),
        Status::AccessDenied => HRESULT::from(ERROR_ACCESS_DENIED),
        Status::OutOfMemory => E_OUTOFMEMORY,
        Status::NotSupported => HRESULT::from(ERROR_NOT_SUPPORTED),
    }
}

/// Resolve the provider for a callback and run `body` against it.
unsafe fn bridge<F>(callback_data: *const PRJ_CALLBACK_DATA, name: &'static str, body: F) -> HRESULT
where
    F: FnOnce(&CallbackArgs, &dyn ProjectionCallbacks) -> Status,
{
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let Some(args) = (unsafe { CallbackArgs::decode(callback_data) }) else {
            tracing::error!("{}: undecodable callback data", name);
            return Status::InternalError;
        };
        let Some(provider) = INSTANCES.get(args.instance_id) else {
            tracing::error!("{}: no provider registered as {}", name, args.instance_id);
            return Status::InternalError;
        };
        body(&args, provider.as_ref())
    }));

    match outcome {
        Ok(status) => status_to_hresult(status),
        Err(_) => {
            tracing::error!("{}: callback panicked", name);
            status_to_hresult(Status::InternalError)
        }
    }
}

/// Owned copy of the fields of `PRJ_CALLBACK_DATA` the provider consumes.
struct CallbackArgs {
    data: *const PRJ_CALLBACK_DATA,
    instance_id: usize,
    command_id: i32,
    relative_path: String,
    process_id: u32,
    process_image: String,
}

impl CallbackArgs {
    unsafe fn decode(data: *const PRJ_CALLBACK_DATA) -> Option<Self> {
        if data.is_null() {
            return None;
        }
        let cb: &PRJ_CALLBACK_DATA = &*data;
        let relative_path: String = pcwstr_to_string(cb.FilePathName).ok()?;
        let process_image: String =
            pcwstr_to_string(cb.TriggeringProcessImageFileName).unwrap_or_default();

        Some(Self {
            data,
            instance_id: cb.InstanceContext as usize,
            command_id: cb.CommandId,
            relative_path,
            process_id: cb.TriggeringProcessId,
            process_image,
        })
    }

    fn request(&self) -> RequestInfo<'_> {
        RequestInfo {
            command_id: self.command_id,
            process: self.process(),
        }
    }

    fn process(&self) -> ProcessInfo<'_> {
        ProcessInfo {
            id: self.process_id,
            image: &self.process_image,
        }
    }

    fn raw(&self) -> &PRJ_CALLBACK_DATA {
        // Valid for the duration of the callback that produced it.
        unsafe { &*self.data }
    }

    fn engine(&self) -> NativeEngine {
        NativeEngine::new(self.raw().NamespaceVirtualizationContext)
    }
}

pub unsafe extern "system" fn start_dir_enum_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
    enumeration_id: *const GUID,
) -> HRESULT {
    let session = guid_to_uuid(&*enumeration_id);
    bridge(callback_data, "StartDirectoryEnumeration", |args, provider| {
        provider.start_directory_enumeration(&args.request(), session, &args.relative_path)
    })
}

pub unsafe extern "system" fn get_dir_enum_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
    enumeration_id: *const GUID,
    search_expression: PCWSTR,
    dir_entry_buffer_handle: PRJ_DIR_ENTRY_BUFFER_HANDLE,
) -> HRESULT {
    let session = guid_to_uuid(&*enumeration_id);
    let filter: Option<String> = if search_expression.is_null() {
        None
    } else {
        pcwstr_to_string(search_expression).ok()
    };

    bridge(callback_data, "GetDirectoryEnumeration", |args, provider| {
        let restart: bool = (args.raw().Flags.0 & PRJ_CB_DATA_FLAG_ENUM_RESTART_SCAN.0) != 0;
        let mut sink = NativeDirEntryBuffer::new(dir_entry_buffer_handle);
        provider.get_directory_enumeration(
            &args.request(),
            session,
            filter.as_deref(),
            restart,
            &mut sink,
        )
    })
}

pub unsafe extern "system" fn end_dir_enum_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
    enumeration_id: *const GUID,
) -> HRESULT {
    let session = guid_to_uuid(&*enumeration_id);
    bridge(callback_data, "EndDirectoryEnumeration", |_, provider| {
        provider.end_directory_enumeration(session)
    })
}

pub unsafe extern "system" fn get_placeholder_info_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
) -> HRESULT {
    bridge(callback_data, "GetPlaceholderInfo", |args, provider| {
        let engine = args.engine();
        provider.get_placeholder_info(&engine, &args.request(), &args.relative_path)
    })
}

pub unsafe extern "system" fn get_file_data_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
    byte_offset: u64,
    length: u32,
) -> HRESULT {
    bridge(callback_data, "GetFileData", |args, provider| {
        let cb: &PRJ_CALLBACK_DATA = args.raw();
        let (content_id, provider_id): (&[u8], &[u8]) = if cb.VersionInfo.is_null() {
            (&[], &[])
        } else {
            let version = unsafe { &*cb.VersionInfo };
            (&version.ContentID[..], &version.ProviderID[..])
        };

        let request = FileDataRequest {
            relative_path: &args.relative_path,
            byte_offset,
            length,
            data_stream_id: guid_to_uuid(&cb.DataStreamId),
            content_id,
            provider_id,
        };
        let engine = args.engine();
        provider.get_file_data(&engine, &args.request(), &request)
    })
}

pub unsafe extern "system" fn query_file_name_cb(callback_data: *const PRJ_CALLBACK_DATA) -> HRESULT {
    bridge(callback_data, "QueryFileName", |args, provider| {
        provider.query_file_name(&args.relative_path)
    })
}

pub unsafe extern "system" fn notification_cb(
    callback_data: *const PRJ_CALLBACK_DATA,
    is_directory: BOOLEAN,
    notification: PRJ_NOTIFICATION,
    destination_file_name: PCWSTR,
    operation_parameters: *mut PRJ_NOTIFICATION_PARAMETERS,
) -> HRESULT {
    let Some(kind) = NotificationKind::from_raw(notification.0 as u32) else {
        tracing::warn!("Notification: unrecognised kind {}", notification.0);
        return S_OK;
    };
    let destination: Option<String> = if destination_file_name.is_null() {
        None
    } else {
        pcwstr_to_string(destination_file_name).ok()
    };

    bridge(callback_data, "Notification", |args, provider| {
        let is_file_modified: bool = match kind {
            NotificationKind::FileHandleClosedFileModified => true,
            NotificationKind::FileHandleClosedFileDeleted if !operation_parameters.is_null() => {
                unsafe { (*operation_parameters).FileDeletedOnHandleClose.IsFileModified.as_bool() }
            }
            _ => false,
        };

        let event = NotificationEvent {
            kind,
            relative_path: &args.relative_path,
            destination_path: destination.as_deref().filter(|d| !d.is_empty()),
            is_directory: is_directory.as_bool(),
            process: args.process(),
            is_file_modified,
        };
        let outcome = provider.notify(&event);

        if let (Some(mask), false) = (outcome.new_mask, operation_parameters.is_null()) {
            let bits = PRJ_NOTIFY_TYPES(mask.bits());
            unsafe {
                match kind {
                    NotificationKind::FileRenamed => {
                        (*operation_parameters).FileRenamed.NotificationMask = bits;
                    }
                    _ => (*operation_parameters).PostCreate.NotificationMask = bits,
                }
            }
        }
        outcome.status
    })
}

pub unsafe extern "system" fn cancel_command_cb(callback_data: *const PRJ_CALLBACK_DATA) {
    let _ = bridge(callback_data, "CancelCommand", |args, provider| {
        provider.cancel_command(args.command_id);
        Status::Ok
    });
}

/// Build the callback table shared by every instance.
pub fn build_callbacks() -> PRJ_CALLBACKS {
    PRJ_CALLBACKS {
        StartDirectoryEnumerationCallback: Some(start_dir_enum_cb),
        EndDirectoryEnumerationCallback: Some(end_dir_enum_cb),
        GetDirectoryEnumerationCallback: Some(get_dir_enum_cb),
        GetPlaceholderInfoCallback: Some(get_placeholder_info_cb),
        GetFileDataCallback: Some(get_file_data_cb),
        QueryFileNameCallback: Some(query_file_name_cb),
        NotificationCallback: Some(notification_cb),
        CancelCommandCallback: Some(cancel_command_cb),
    }
}

/// Register a provider for callback dispatch.
///
/// # Returns
/// Registry id to pass as `InstanceContext`.
pub fn register(provider: Arc<dyn ProjectionCallbacks>) -> usize {
    INSTANCES.register(provider)
}

/// Remove a provider registered with [`register`].
pub fn unregister(id: usize) {
    INSTANCES.unregister(id);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_to_hresult() {
        assert_eq!(status_to_hresult(Status::Ok), S_OK);
        assert_eq!(
            status_to_hresult(Status::NotFound),
            HRESULT::from(ERROR_FILE_NOT_FOUND)
        );
        assert_eq!(
            status_to_hresult(Status::InsufficientBuffer),
            HRESULT::from(ERROR_INSUFFICIENT_BUFFER)
        );
        assert_eq!(status_to_hresult(Status::OutOfMemory), E_OUTOFMEMORY);
        assert!(status_to_hresult(Status::AccessDenied).is_err());
    }
}
