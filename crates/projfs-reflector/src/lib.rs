//! ProjFS provider that reflects a layer directory into a virtualization root.
//!
//! Directory listings, placeholder metadata and file content are served on
//! demand from the layer, so the virtualization root looks like a copy of it
//! without anything being copied up front.
//!
//! # Architecture
//!
//! ```text
//! virtualizer  (ProjFS registration, raw callbacks, HRESULT mapping)
//!      |
//! callbacks    (ReflectorProvider: ProjectionCallbacks over the pieces below)
//!      |
//! enumeration / projection / notification
//!      |
//! layer        (LayerStore: the backing directory)
//! ```
//!
//! Everything above `virtualizer` is platform independent and talks to the
//! engine only through [`engine::EngineTransport`] and [`engine::DirEntrySink`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use projfs_reflector::{FsLayer, ProviderOptions, ReflectorProvider, VirtualizationInstance};
//!
//! let options = ProviderOptions::new("C:\\layer", "C:\\virt").with_notifications(true);
//! let layer = Arc::new(FsLayer::new(&options.source_root)?);
//! let provider = Arc::new(ReflectorProvider::new(layer, &options));
//! let instance = VirtualizationInstance::new(options, provider)?;
//! instance.start()?;
//! ```

pub mod callbacks;
pub mod engine;
pub mod enumeration;
pub mod error;
pub mod layer;
pub mod notification;
pub mod options;
pub mod projection;
pub mod util;
pub mod virtualizer;

pub use callbacks::{ProcessInfo, ProjectionCallbacks, ReflectorProvider, RequestInfo};
pub use engine::{DirEntrySink, EngineTransport, SinkOutcome, WriteBuffer};
pub use enumeration::{EnumerationBatch, EnumerationSessionTable, SessionId};
pub use error::{ProviderError, Result, Status};
pub use layer::{FileAttributes, FileRecord, FileTimes, FsLayer, LayerFile, LayerStore};
pub use notification::{NotificationEvent, NotificationKind, NotificationOutcome, NotificationType};
pub use options::{FilterCapture, ProviderOptions};
pub use projection::{FileDataRequest, PlaceholderDescriptor};
pub use virtualizer::VirtualizationInstance;

/// Check whether this build has a ProjFS transport.
pub fn projfs_available() -> bool {
    cfg!(target_os = "windows")
}
