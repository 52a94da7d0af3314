//! The reflector provider: projects a layer directory as-is.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::callbacks::{CommandTracker, ProjectionCallbacks, RequestInfo};
use crate::engine::{DirEntrySink, EngineTransport};
use crate::enumeration::{EnumerationBatch, EnumerationSessionTable, SessionId};
use crate::error::{ProviderError, Result, Status};
use crate::layer::LayerStore;
use crate::notification::{
    EventSignaller, NamedEventSignaller, NotificationDispatcher, NotificationEvent,
    NotificationOutcome, NotificationPolicy, NotificationType, TestModeSignal,
    PROVIDER_TEST_PROCEED,
};
use crate::options::ProviderOptions;
use crate::projection::{FileDataRequest, HydrationPipeline};

/// Projects a layer directory through the engine.
///
/// Composes the enumeration session table, the hydration pipeline and the
/// notification dispatcher behind [`ProjectionCallbacks`].
pub struct ReflectorProvider {
    layer: Arc<dyn LayerStore>,
    enumerations: EnumerationSessionTable,
    hydration: HydrationPipeline,
    notifications: NotificationDispatcher,
    test_signal: Arc<TestModeSignal>,
    commands: CommandTracker,
}

impl ReflectorProvider {
    /// Create a provider that signals Win32 named events in test mode.
    ///
    /// # Arguments
    /// * `layer` - Backing store
    /// * `options` - Provider configuration
    pub fn new(layer: Arc<dyn LayerStore>, options: &ProviderOptions) -> Self {
        Self::with_signaller(layer, options, Box::new(NamedEventSignaller))
    }

    /// Create a provider with a custom test-mode event backend.
    ///
    /// # Arguments
    /// * `layer` - Backing store
    /// * `options` - Provider configuration
    /// * `signaller` - Event backend used when `options.test_mode` is set
    pub fn with_signaller(
        layer: Arc<dyn LayerStore>,
        options: &ProviderOptions,
        signaller: Box<dyn EventSignaller>,
    ) -> Self {
        let test_signal = Arc::new(TestModeSignal::new(options.test_mode, signaller));
        let notifications = NotificationDispatcher::new(
            NotificationPolicy::from_options(options),
            Arc::clone(&test_signal),
        );

        tracing::info!(
            layer = %layer.root().display(),
            notifications = options.notifications_enabled(),
            test_mode = options.test_mode,
            deny_deletes = options.deny_deletes,
            "created reflector provider"
        );

        Self {
            enumerations: EnumerationSessionTable::new(options.filter_capture),
            hydration: HydrationPipeline::new(Arc::clone(&layer), options),
            notifications,
            test_signal,
            commands: CommandTracker::new(),
            layer,
        }
    }

    /// Active enumeration sessions.
    pub fn enumerations(&self) -> &EnumerationSessionTable {
        &self.enumerations
    }

    /// Placeholder and content pipeline.
    pub fn hydration(&self) -> &HydrationPipeline {
        &self.hydration
    }

    /// In-flight cancellable commands.
    pub fn commands(&self) -> &CommandTracker {
        &self.commands
    }

    /// Whether test mode is still active.
    pub fn is_test_mode(&self) -> bool {
        self.test_signal.is_enabled()
    }
}

/// Run one callback body, mapping errors and panics to a status.
fn guarded<F>(operation: &'static str, path: &str, body: F) -> Status
where
    F: FnOnce() -> Result<Status>,
{
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(status)) => {
            tracing::debug!(operation, path = %path, ?status, "<---- return");
            status
        }
        Ok(Err(e)) => {
            let status: Status = e.status();
            match &e {
                ProviderError::NotFound { .. } => {
                    tracing::debug!(operation, path = %path, "not found in layer")
                }
                ProviderError::UnknownSession(_) | ProviderError::DuplicateSession(_) => {
                    tracing::warn!(operation, path = %path, error = %e, "enumeration protocol violation")
                }
                ProviderError::Cancelled(_) => {
                    tracing::info!(operation, path = %path, error = %e, "command cancelled")
                }
                _ => tracing::error!(operation, path = %path, error = %e, "callback failed"),
            }
            status
        }
        Err(_) => {
            tracing::error!(operation, path = %path, "callback panicked");
            Status::InternalError
        }
    }
}

impl ProjectionCallbacks for ReflectorProvider {
    fn start_directory_enumeration(
        &self,
        info: &RequestInfo<'_>,
        session_id: SessionId,
        relative_path: &str,
    ) -> Status {
        tracing::debug!(
            path = %relative_path,
            session = %session_id,
            process = %info.process.image,
            pid = info.process.id,
            "----> StartDirectoryEnumeration"
        );
        guarded("StartDirectoryEnumeration", relative_path, || {
            self.enumerations
                .start(session_id, relative_path, self.layer.as_ref())
                .map(|()| Status::Ok)
        })
    }

    fn get_directory_enumeration(
        &self,
        info: &RequestInfo<'_>,
        session_id: SessionId,
        filter: Option<&str>,
        restart: bool,
        sink: &mut dyn DirEntrySink,
    ) -> Status {
        tracing::debug!(
            session = %session_id,
            filter = ?filter,
            restart,
            process = %info.process.image,
            pid = info.process.id,
            command = info.command_id,
            "----> GetDirectoryEnumeration"
        );
        guarded("GetDirectoryEnumeration", "", || {
            let resolve = |path: &str| self.hydration.resolve_symlink_target(path);
            let batch: EnumerationBatch =
                self.enumerations.get(session_id, filter, restart, sink, &resolve)?;
            tracing::debug!(session = %session_id, ?batch, "enumeration round");
            Ok(batch.status())
        })
    }

    fn end_directory_enumeration(&self, session_id: SessionId) -> Status {
        tracing::debug!(session = %session_id, "----> EndDirectoryEnumeration");
        guarded("EndDirectoryEnumeration", "", || {
            self.enumerations.end(session_id).map(|()| Status::Ok)
        })
    }

    fn get_placeholder_info(
        &self,
        engine: &dyn EngineTransport,
        info: &RequestInfo<'_>,
        relative_path: &str,
    ) -> Status {
        tracing::debug!(
            path = %relative_path,
            process = %info.process.image,
            pid = info.process.id,
            "----> GetPlaceholderInfo"
        );
        guarded("GetPlaceholderInfo", relative_path, || {
            self.hydration
                .write_placeholder(engine, relative_path)
                .map(|()| Status::Ok)
        })
    }

    fn get_file_data(
        &self,
        engine: &dyn EngineTransport,
        info: &RequestInfo<'_>,
        request: &FileDataRequest<'_>,
    ) -> Status {
        tracing::debug!(
            path = %request.relative_path,
            offset = request.byte_offset,
            length = request.length,
            process = %info.process.image,
            pid = info.process.id,
            "----> GetFileData"
        );
        guarded("GetFileData", request.relative_path, || {
            let command = self.commands.begin(info.command_id);
            self.hydration
                .get_file_data(engine, request, &|| command.check())
                .map(|()| Status::Ok)
        })
    }

    fn query_file_name(&self, relative_path: &str) -> Status {
        tracing::debug!(path = %relative_path, "----> QueryFileName");
        guarded("QueryFileName", relative_path, || {
            self.hydration.query_file_name(relative_path).map(|()| Status::Ok)
        })
    }

    fn notify(&self, event: &NotificationEvent<'_>) -> NotificationOutcome {
        let result = catch_unwind(AssertUnwindSafe(|| self.notifications.dispatch(event)));
        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(kind = %event.kind, path = %event.relative_path, "notification handler panicked");
                NotificationOutcome {
                    status: Status::InternalError,
                    new_mask: None,
                }
            }
        }
    }

    fn cancel_command(&self, command_id: i32) {
        if self.commands.cancel(command_id) {
            tracing::info!(command = command_id, "cancel requested");
        } else {
            tracing::debug!(command = command_id, "cancel for command not in flight");
        }
    }

    fn notification_mask(&self) -> NotificationType {
        self.notifications.policy().subscriptions()
    }

    fn virtualization_started(&self) -> Result<()> {
        self.test_signal.signal_if_enabled(PROVIDER_TEST_PROCEED)
    }
}
