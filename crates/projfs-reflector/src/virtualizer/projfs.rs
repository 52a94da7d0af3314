//! Virtualization instance lifecycle over ProjFS.

use std::ffi::c_void;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;
use windows::core::{GUID, PCWSTR};
use windows::Win32::Storage::ProjectedFileSystem::{
    PrjGetOnDiskFileState, PrjMarkDirectoryAsPlaceholder, PrjStartVirtualizing,
    PrjStopVirtualizing, PRJ_CALLBACKS, PRJ_FLAG_NONE, PRJ_FLAG_USE_NEGATIVE_PATH_CACHE,
    PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT, PRJ_NOTIFICATION_MAPPING, PRJ_NOTIFY_TYPES,
    PRJ_STARTVIRTUALIZING_OPTIONS,
};

use crate::callbacks::ProjectionCallbacks;
use crate::error::{ProviderError, Result};
use crate::options::ProviderOptions;
use crate::util::wstr::{string_to_wide, WideBuf};
use crate::virtualizer::callbacks::{build_callbacks, register, unregister};
use crate::virtualizer::native::uuid_to_guid;
use crate::virtualizer::sendable::SendableContext;

/// Resources owned while the engine is dispatching callbacks.
struct RunningState {
    context: SendableContext,
    registry_id: usize,
    _callbacks: Box<PRJ_CALLBACKS>,
    _notification_root: WideBuf,
}

/// A ProjFS virtualization instance bound to one provider.
pub struct VirtualizationInstance {
    provider: Arc<dyn ProjectionCallbacks>,
    options: ProviderOptions,
    instance_id: Uuid,
    state: Mutex<Option<RunningState>>,
}

impl VirtualizationInstance {
    /// Prepare the virtualization root for `provider`.
    ///
    /// Creates the root if it is absent and marks it as a virtualization
    /// root unless it already is one.
    ///
    /// # Arguments
    /// * `options` - Provider configuration; `virt_root` is used here
    /// * `provider` - Callback implementation
    pub fn new(options: ProviderOptions, provider: Arc<dyn ProjectionCallbacks>) -> Result<Self> {
        let instance_id: Uuid = Uuid::new_v4();
        ensure_virtualization_root(&options.virt_root, instance_id)?;

        Ok(Self {
            provider,
            options,
            instance_id,
            state: Mutex::new(None),
        })
    }

    /// Start dispatching engine callbacks to the provider.
    pub fn start(&self) -> Result<()> {
        let mut state = self.state.lock();
        if state.is_some() {
            return Err(ProviderError::AlreadyStarted);
        }

        let root_wide: WideBuf = string_to_wide(&root_string(&self.options.virt_root)?);
        let callbacks: Box<PRJ_CALLBACKS> = Box::new(build_callbacks());
        let notification_root: WideBuf = string_to_wide("");
        let mask_bits: u32 = self.provider.notification_mask().bits();

        let mut mappings: Vec<PRJ_NOTIFICATION_MAPPING> = Vec::new();
        if mask_bits != 0 {
            mappings.push(PRJ_NOTIFICATION_MAPPING {
                NotificationBitMask: PRJ_NOTIFY_TYPES(mask_bits),
                NotificationRoot: PCWSTR::from_raw(notification_root.as_ptr()),
            });
        }

        let start_options = PRJ_STARTVIRTUALIZING_OPTIONS {
            Flags: if self.options.enable_negative_path_cache {
                PRJ_FLAG_USE_NEGATIVE_PATH_CACHE
            } else {
                PRJ_FLAG_NONE
            },
            PoolThreadCount: self.options.pool_thread_count,
            ConcurrentThreadCount: self.options.concurrent_thread_count,
            NotificationMappings: if mappings.is_empty() {
                std::ptr::null_mut()
            } else {
                mappings.as_mut_ptr()
            },
            NotificationMappingsCount: mappings.len() as u32,
        };

        let registry_id: usize = register(Arc::clone(&self.provider));
        let started = unsafe {
            PrjStartVirtualizing(
                PCWSTR::from_raw(root_wide.as_ptr()),
                &*callbacks,
                Some(registry_id as *const c_void),
                Some(&start_options),
            )
        };
        let context: PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT = match started {
            Ok(context) => context,
            Err(e) => {
                unregister(registry_id);
                tracing::error!("Failed to start virtualization instance: {}", e);
                return Err(ProviderError::Engine {
                    operation: "PrjStartVirtualizing",
                    code: e.code().0,
                });
            }
        };

        tracing::info!(
            root = %self.options.virt_root.display(),
            notifications = format_args!("{:#x}", mask_bits),
            "Virtualization started"
        );

        *state = Some(RunningState {
            context: SendableContext::new(context),
            registry_id,
            _callbacks: callbacks,
            _notification_root: notification_root,
        });

        if let Err(e) = self.provider.virtualization_started() {
            tracing::error!("Provider failed after start, stopping: {}", e);
            if let Some(running) = state.take() {
                shutdown(running);
            }
            return Err(e);
        }

        Ok(())
    }

    /// Stop dispatching callbacks.
    pub fn stop(&self) -> Result<()> {
        let running: RunningState = self.state.lock().take().ok_or(ProviderError::NotStarted)?;
        shutdown(running);
        tracing::info!(root = %self.options.virt_root.display(), "Virtualization stopped");
        Ok(())
    }

    /// Check if virtualization is started.
    pub fn is_started(&self) -> bool {
        self.state.lock().is_some()
    }

    /// Instance id used when this process marked the root.
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }
}

impl Drop for VirtualizationInstance {
    fn drop(&mut self) {
        if let Some(running) = self.state.lock().take() {
            shutdown(running);
        }
    }
}

fn shutdown(running: RunningState) {
    unsafe { PrjStopVirtualizing(running.context.inner()) };
    unregister(running.registry_id);
}

fn root_string(root: &Path) -> Result<String> {
    root.to_str()
        .map(str::to_owned)
        .ok_or_else(|| ProviderError::InvalidRootPath(root.display().to_string()))
}

/// Create the root if needed and mark it as a virtualization root.
fn ensure_virtualization_root(root: &Path, instance_id: Uuid) -> Result<()> {
    let root_str: String = root_string(root)?;
    let root_wide: WideBuf = string_to_wide(&root_str);

    let needs_mark: bool = if root.exists() {
        // A zero state means the directory is not yet a ProjFS root.
        match unsafe { PrjGetOnDiskFileState(PCWSTR::from_raw(root_wide.as_ptr())) } {
            Ok(state) => state.0 == 0,
            Err(_) => true,
        }
    } else {
        tracing::info!("Creating virtualization root {}", root_str);
        std::fs::create_dir_all(root).map_err(|e| ProviderError::io_error(&root_str, e))?;
        true
    };

    if !needs_mark {
        tracing::debug!("{} is already a virtualization root", root_str);
        return Ok(());
    }

    let guid: GUID = uuid_to_guid(instance_id);
    unsafe {
        PrjMarkDirectoryAsPlaceholder(
            PCWSTR::from_raw(root_wide.as_ptr()),
            PCWSTR::null(),
            None,
            &guid,
        )
    }
    .map_err(|e| {
        tracing::error!("Failed to mark virtualization root {}: {}", root_str, e);
        ProviderError::Engine {
            operation: "PrjMarkDirectoryAsPlaceholder",
            code: e.code().0,
        }
    })?;

    tracing::info!(instance = %instance_id, "Marked {} as virtualization root", root_str);
    Ok(())
}
