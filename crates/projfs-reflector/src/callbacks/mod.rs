//! The capability interface the transport drives, and its implementation.
//!
//! [`ProjectionCallbacks`] has one method per engine callback. Every method
//! returns a value from the closed [`Status`] taxonomy; no error or panic
//! crosses this boundary.

mod commands;
mod provider;
mod registry;

pub use commands::{CommandGuard, CommandTracker};
pub use provider::ReflectorProvider;
pub use registry::InstanceRegistry;

use crate::engine::{DirEntrySink, EngineTransport};
use crate::enumeration::SessionId;
use crate::error::{Result, Status};
use crate::notification::{NotificationEvent, NotificationOutcome, NotificationType};
use crate::projection::FileDataRequest;

/// Process that triggered a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessInfo<'a> {
    /// Process id.
    pub id: u32,
    /// Image file name (may be empty).
    pub image: &'a str,
}

/// Fields common to every command-carrying callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestInfo<'a> {
    /// Engine command id.
    pub command_id: i32,
    /// Triggering process.
    pub process: ProcessInfo<'a>,
}

/// Provider capability interface, one method per engine callback.
///
/// Called concurrently from engine worker threads.
pub trait ProjectionCallbacks: Send + Sync {
    /// Start an enumeration session for a directory.
    fn start_directory_enumeration(
        &self,
        info: &RequestInfo<'_>,
        session_id: SessionId,
        relative_path: &str,
    ) -> Status;

    /// Fill `sink` with the next entries of a session.
    fn get_directory_enumeration(
        &self,
        info: &RequestInfo<'_>,
        session_id: SessionId,
        filter: Option<&str>,
        restart: bool,
        sink: &mut dyn DirEntrySink,
    ) -> Status;

    /// End an enumeration session.
    fn end_directory_enumeration(&self, session_id: SessionId) -> Status;

    /// Persist the placeholder for a path through `engine`.
    fn get_placeholder_info(
        &self,
        engine: &dyn EngineTransport,
        info: &RequestInfo<'_>,
        relative_path: &str,
    ) -> Status;

    /// Stream file content through `engine`.
    fn get_file_data(
        &self,
        engine: &dyn EngineTransport,
        info: &RequestInfo<'_>,
        request: &FileDataRequest<'_>,
    ) -> Status;

    /// Probe whether a path exists.
    fn query_file_name(&self, relative_path: &str) -> Status;

    /// Decide a notification.
    fn notify(&self, event: &NotificationEvent<'_>) -> NotificationOutcome;

    /// Advisory cancel for an in-flight command.
    fn cancel_command(&self, command_id: i32);

    /// Notification kinds to register with the engine.
    fn notification_mask(&self) -> NotificationType {
        NotificationType::empty()
    }

    /// Called once the engine is dispatching callbacks.
    ///
    /// An error makes the transport stop virtualization again.
    fn virtualization_started(&self) -> Result<()> {
        Ok(())
    }
}
