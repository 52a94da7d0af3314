//! Named-event signalling for test harnesses.
//!
//! In test mode the provider signals a named event for every notification
//! it handles, and `ProviderTestProceed` once it is running. A harness
//! creates the events up front and waits on them.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ProviderError, Result};

/// Event signalled once virtualization has started.
pub const PROVIDER_TEST_PROCEED: &str = "ProviderTestProceed";

/// Sets a named event.
pub trait EventSignaller: Send + Sync {
    /// Signal `name`.
    ///
    /// # Returns
    /// `NotFound` if no event with that name exists.
    fn signal(&self, name: &str) -> Result<()>;
}

/// Test-mode switch in front of an [`EventSignaller`].
///
/// Test mode is cleared the first time an event turns out not to exist,
/// after which signalling is a no-op.
pub struct TestModeSignal {
    enabled: AtomicBool,
    signaller: Box<dyn EventSignaller>,
}

impl TestModeSignal {
    /// Create a switch.
    ///
    /// # Arguments
    /// * `enabled` - Whether test mode starts on
    /// * `signaller` - Event backend
    pub fn new(enabled: bool, signaller: Box<dyn EventSignaller>) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            signaller,
        }
    }

    /// A switch that never signals.
    pub fn disabled() -> Self {
        Self::new(false, Box::new(NullSignaller))
    }

    /// Check if test mode is still on.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Signal `name` if test mode is on.
    ///
    /// A missing event clears test mode and is not an error.
    ///
    /// # Arguments
    /// * `name` - Event name
    pub fn signal_if_enabled(&self, name: &str) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        match self.signaller.signal(name) {
            Ok(()) => {
                tracing::debug!(event = name, "signalled test event");
                Ok(())
            }
            Err(ProviderError::NotFound { .. }) => {
                tracing::error!(
                    event = name,
                    "test mode specified but wait event does not exist, clearing test mode"
                );
                self.enabled.store(false, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                tracing::error!(event = name, error = %e, "failed to signal test event");
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for TestModeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestModeSignal")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

struct NullSignaller;

impl EventSignaller for NullSignaller {
    fn signal(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

/// Signals Win32 named events opened with `OpenEventW`.
#[cfg(target_os = "windows")]
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedEventSignaller;

#[cfg(target_os = "windows")]
impl EventSignaller for NamedEventSignaller {
    fn signal(&self, name: &str) -> Result<()> {
        use windows::core::{HRESULT, PCWSTR};
        use windows::Win32::Foundation::{CloseHandle, ERROR_FILE_NOT_FOUND, HANDLE};
        use windows::Win32::System::Threading::{OpenEventW, SetEvent, EVENT_MODIFY_STATE};

        use crate::util::wstr::string_to_wide;

        let name_wide = string_to_wide(name);

        unsafe {
            let handle: HANDLE =
                match OpenEventW(EVENT_MODIFY_STATE, false, PCWSTR::from_raw(name_wide.as_ptr())) {
                    Ok(handle) => handle,
                    Err(e) if e.code() == HRESULT::from(ERROR_FILE_NOT_FOUND) => {
                        return Err(ProviderError::not_found(name));
                    }
                    Err(e) => {
                        return Err(ProviderError::Engine {
                            operation: "OpenEventW",
                            code: e.code().0,
                        })
                    }
                };

            let result = SetEvent(handle);
            let _ = CloseHandle(handle);
            result.map_err(|e| ProviderError::Engine {
                operation: "SetEvent",
                code: e.code().0,
            })
        }
    }
}

/// Named events are a Windows facility.
#[cfg(not(target_os = "windows"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct NamedEventSignaller;

#[cfg(not(target_os = "windows"))]
impl EventSignaller for NamedEventSignaller {
    fn signal(&self, name: &str) -> Result<()> {
        Err(ProviderError::NotSupported(format!("named event {name}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder {
        signalled: Mutex<Vec<String>>,
        missing: bool,
    }

    impl EventSignaller for Arc<Recorder> {
        fn signal(&self, name: &str) -> Result<()> {
            if self.missing {
                return Err(ProviderError::not_found(name));
            }
            self.signalled.lock().push(name.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_disabled_never_signals() {
        let recorder = Arc::new(Recorder::default());
        let signal = TestModeSignal::new(false, Box::new(Arc::clone(&recorder)));
        signal.signal_if_enabled("PreDelete").unwrap();
        assert!(recorder.signalled.lock().is_empty());
    }

    #[test]
    fn test_enabled_signals() {
        let recorder = Arc::new(Recorder::default());
        let signal = TestModeSignal::new(true, Box::new(Arc::clone(&recorder)));
        signal.signal_if_enabled(PROVIDER_TEST_PROCEED).unwrap();
        assert_eq!(*recorder.signalled.lock(), vec![PROVIDER_TEST_PROCEED.to_string()]);
    }

    #[test]
    fn test_missing_event_clears_test_mode() {
        let recorder = Arc::new(Recorder {
            missing: true,
            ..Default::default()
        });
        let signal = TestModeSignal::new(true, Box::new(Arc::clone(&recorder)));
        signal.signal_if_enabled("FileOpened").unwrap();
        assert!(!signal.is_enabled());
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_other_failures_propagate() {
        let signal = TestModeSignal::new(true, Box::new(NamedEventSignaller));
        let err = signal.signal_if_enabled("FileOpened").unwrap_err();
        assert!(matches!(err, ProviderError::NotSupported(_)));
        assert!(signal.is_enabled());
    }
}
