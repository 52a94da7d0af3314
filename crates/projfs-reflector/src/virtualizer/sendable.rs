//! Send + Sync wrapper for the namespace virtualization context.

use windows::Win32::Storage::ProjectedFileSystem::PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT;

/// Namespace context handle that may cross threads.
///
/// # Safety
///
/// ProjFS allows `PrjWriteFileData`, `PrjWritePlaceholderInfo2` and the
/// aligned-buffer functions to be called from any thread for a running
/// instance, and `PrjStopVirtualizing` from the thread that owns the
/// instance. The handle is only used for those calls.
#[derive(Clone, Copy)]
pub struct SendableContext(PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT);

unsafe impl Send for SendableContext {}

unsafe impl Sync for SendableContext {}

impl SendableContext {
    /// Wrap a context handle.
    ///
    /// # Arguments
    /// * `context` - Context returned by `PrjStartVirtualizing` or passed in
    ///   `PRJ_CALLBACK_DATA`
    pub fn new(context: PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT) -> Self {
        Self(context)
    }

    /// Get the inner context.
    pub fn inner(&self) -> PRJ_NAMESPACE_VIRTUALIZATION_CONTEXT {
        self.0
    }
}

impl std::fmt::Debug for SendableContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SendableContext({:p})", self.0 .0 as *const ())
    }
}
