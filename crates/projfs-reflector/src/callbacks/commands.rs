//! In-flight command tracking for advisory cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{ProviderError, Result};

/// In-flight commands that may be cancelled.
#[derive(Debug, Default)]
pub struct CommandTracker {
    commands: DashMap<i32, Arc<AtomicBool>>,
}

impl CommandTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command for the lifetime of the returned guard.
    ///
    /// # Arguments
    /// * `command_id` - Engine command id
    pub fn begin(&self, command_id: i32) -> CommandGuard<'_> {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.commands.insert(command_id, Arc::clone(&cancelled));
        CommandGuard {
            tracker: self,
            command_id,
            cancelled,
        }
    }

    /// Flag a command as cancelled.
    ///
    /// # Arguments
    /// * `command_id` - Engine command id
    ///
    /// # Returns
    /// True if the command was in flight.
    pub fn cancel(&self, command_id: i32) -> bool {
        match self.commands.get(&command_id) {
            Some(flag) => {
                flag.store(true, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Number of commands in flight.
    pub fn in_flight(&self) -> usize {
        self.commands.len()
    }
}

/// Registration of one in-flight command; deregisters on drop.
#[derive(Debug)]
pub struct CommandGuard<'a> {
    tracker: &'a CommandTracker,
    command_id: i32,
    cancelled: Arc<AtomicBool>,
}

impl CommandGuard<'_> {
    /// Check if the engine cancelled this command.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fail with `Cancelled` once the command has been cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ProviderError::Cancelled(self.command_id))
        } else {
            Ok(())
        }
    }
}

impl Drop for CommandGuard<'_> {
    fn drop(&mut self) {
        // A reused command id may already belong to a newer guard.
        self.tracker
            .commands
            .remove_if(&self.command_id, |_, flag| Arc::ptr_eq(flag, &self.cancelled));
    }
}
