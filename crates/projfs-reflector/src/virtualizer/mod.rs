//! Engine transport: registration with ProjFS and the raw callback layer.
//!
//! Only Windows has a real transport. Elsewhere [`VirtualizationInstance`]
//! exists so the provider and its tests build, but cannot start.

#[cfg(target_os = "windows")]
mod callbacks;
#[cfg(target_os = "windows")]
mod native;
#[cfg(target_os = "windows")]
mod projfs;
#[cfg(target_os = "windows")]
mod sendable;

#[cfg(target_os = "windows")]
pub use callbacks::status_to_hresult;
#[cfg(target_os = "windows")]
pub use projfs::VirtualizationInstance;

#[cfg(not(target_os = "windows"))]
pub use stub::VirtualizationInstance;

#[cfg(not(target_os = "windows"))]
mod stub {
    use std::sync::Arc;

    use crate::callbacks::ProjectionCallbacks;
    use crate::error::{ProviderError, Result};
    use crate::options::ProviderOptions;

    /// Placeholder instance for platforms without ProjFS.
    pub struct VirtualizationInstance {
        options: ProviderOptions,
        provider: Arc<dyn ProjectionCallbacks>,
    }

    impl VirtualizationInstance {
        /// Bind a provider; nothing is touched on disk.
        pub fn new(options: ProviderOptions, provider: Arc<dyn ProjectionCallbacks>) -> Result<Self> {
            Ok(Self { options, provider })
        }

        /// Always fails: ProjFS is only available on Windows.
        pub fn start(&self) -> Result<()> {
            tracing::error!(
                root = %self.options.virt_root.display(),
                notifications = self.provider.notification_mask().bits(),
                "ProjFS is unavailable on this platform"
            );
            Err(ProviderError::NotSupported(
                "ProjFS is only available on Windows".to_string(),
            ))
        }

        /// Always fails: an instance here is never started.
        pub fn stop(&self) -> Result<()> {
            Err(ProviderError::NotStarted)
        }

        /// Check if virtualization is started.
        pub fn is_started(&self) -> bool {
            false
        }
    }
}
