//! Turns notifications into decisions.

use std::sync::Arc;

use crate::notification::policy::{NotificationPolicy, OperationPolicy};
use crate::notification::signal::TestModeSignal;
use crate::notification::types::{NotificationEvent, NotificationKind, NotificationOutcome};

/// Routes each notification to the policy decision for its kind.
///
/// Holds only read-only policy and the test-mode switch, so dispatch is
/// reentrant from any engine thread.
pub struct NotificationDispatcher {
    policy: NotificationPolicy,
    test_signal: Arc<TestModeSignal>,
}

impl NotificationDispatcher {
    /// Create a dispatcher.
    ///
    /// # Arguments
    /// * `policy` - Subscriptions and operation decisions
    /// * `test_signal` - Test-mode event signalling
    pub fn new(policy: NotificationPolicy, test_signal: Arc<TestModeSignal>) -> Self {
        Self {
            policy,
            test_signal,
        }
    }

    /// Policy in effect.
    pub fn policy(&self) -> &NotificationPolicy {
        &self.policy
    }

    /// Decide one notification.
    ///
    /// Kinds outside the subscribed mask are allowed untouched.
    ///
    /// # Arguments
    /// * `event` - Notification from the engine
    pub fn dispatch(&self, event: &NotificationEvent<'_>) -> NotificationOutcome {
        if !self.policy.is_subscribed(event.kind) {
            tracing::trace!(kind = %event.kind, path = %event.relative_path, "unsubscribed notification");
            return NotificationOutcome::allow();
        }

        tracing::debug!(
            kind = %event.kind,
            path = %event.relative_path,
            destination = ?event.destination_path,
            is_directory = event.is_directory,
            process = %event.process.image,
            pid = event.process.id,
            "notification"
        );
        if matches!(
            event.kind,
            NotificationKind::FileHandleClosedFileModified | NotificationKind::FileHandleClosedFileDeleted
        ) {
            tracing::debug!(
                path = %event.relative_path,
                modified = event.is_file_modified,
                deleted = event.kind == NotificationKind::FileHandleClosedFileDeleted,
                "handle closed"
            );
        }

        // Signalling failures never change the decision.
        let _ = self.test_signal.signal_if_enabled(event.kind.signal_name());

        let outcome: NotificationOutcome = self.decide(event);
        if !outcome.is_allowed() {
            tracing::info!(
                kind = %event.kind,
                path = %event.relative_path,
                process = %event.process.image,
                pid = event.process.id,
                "operation denied by policy"
            );
        }
        outcome
    }

    fn decide(&self, event: &NotificationEvent<'_>) -> NotificationOutcome {
        let operations: &dyn OperationPolicy = self.policy.operations();

        let allowed: bool = match event.kind {
            NotificationKind::FileOpened => operations.allow_open(event),
            NotificationKind::PreDelete => operations.allow_delete(event),
            NotificationKind::PreRename => operations.allow_rename(event),
            NotificationKind::PreCreateHardlink => operations.allow_hardlink(event),
            NotificationKind::FilePreConvertToFull => operations.allow_convert_to_full(event),
            _ => true,
        };

        if !allowed {
            return NotificationOutcome::deny();
        }

        if event.kind.returns_mask() {
            NotificationOutcome::allow_with_mask(operations.post_operation_mask(event))
        } else {
            NotificationOutcome::allow()
        }
    }
}
