//! Read-only notification policy.

use crate::notification::types::{NotificationEvent, NotificationKind, NotificationType};
use crate::options::ProviderOptions;

/// Decisions for operations the provider may veto.
///
/// Every method defaults to allowing. Implementations must be reentrant.
pub trait OperationPolicy: Send + Sync {
    /// Decide whether a handle may be opened.
    fn allow_open(&self, _event: &NotificationEvent<'_>) -> bool {
        true
    }

    /// Decide whether a file or directory may be deleted.
    fn allow_delete(&self, _event: &NotificationEvent<'_>) -> bool {
        true
    }

    /// Decide whether a file or directory may be renamed.
    fn allow_rename(&self, _event: &NotificationEvent<'_>) -> bool {
        true
    }

    /// Decide whether a hardlink may be created.
    fn allow_hardlink(&self, _event: &NotificationEvent<'_>) -> bool {
        true
    }

    /// Decide whether a placeholder may be converted to a full file.
    fn allow_convert_to_full(&self, _event: &NotificationEvent<'_>) -> bool {
        true
    }

    /// Interest mask to hand back after a post-operation notification.
    fn post_operation_mask(&self, _event: &NotificationEvent<'_>) -> NotificationType {
        NotificationType::USE_EXISTING_MASK
    }
}

/// Allows every operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl OperationPolicy for AllowAll {}

/// Vetoes every delete, regardless of path or process.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyDeletes;

impl OperationPolicy for DenyDeletes {
    fn allow_delete(&self, _event: &NotificationEvent<'_>) -> bool {
        false
    }
}

/// Subscriptions plus operation decisions, fixed at provider start.
pub struct NotificationPolicy {
    subscriptions: NotificationType,
    operations: Box<dyn OperationPolicy>,
}

impl NotificationPolicy {
    /// Create a policy.
    ///
    /// # Arguments
    /// * `subscriptions` - Notification kinds to handle
    /// * `operations` - Veto decisions
    pub fn new(subscriptions: NotificationType, operations: Box<dyn OperationPolicy>) -> Self {
        Self {
            subscriptions,
            operations,
        }
    }

    /// Build the policy described by provider options.
    ///
    /// Notifications are enabled by `notifications` or `test_mode`; the
    /// deny-deletes decision comes from `deny_deletes`.
    pub fn from_options(options: &ProviderOptions) -> Self {
        let subscriptions: NotificationType = if options.notifications_enabled() {
            NotificationType::full_set()
        } else {
            NotificationType::empty()
        };

        let operations: Box<dyn OperationPolicy> = if options.deny_deletes {
            Box::new(DenyDeletes)
        } else {
            Box::new(AllowAll)
        };

        Self::new(subscriptions, operations)
    }

    /// Subscribed notification mask.
    pub fn subscriptions(&self) -> NotificationType {
        self.subscriptions
    }

    /// Check if a kind is subscribed.
    pub fn is_subscribed(&self, kind: NotificationKind) -> bool {
        self.subscriptions.contains(kind.flag())
    }

    /// Operation decisions.
    pub fn operations(&self) -> &dyn OperationPolicy {
        self.operations.as_ref()
    }
}

impl std::fmt::Debug for NotificationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationPolicy")
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_options_disabled() {
        let policy = NotificationPolicy::from_options(&ProviderOptions::new("a", "b"));
        assert!(policy.subscriptions().is_empty());
        assert!(!policy.is_subscribed(NotificationKind::PreDelete));
    }

    #[test]
    fn test_from_options_enabled() {
        let options = ProviderOptions::new("a", "b").with_notifications(true);
        let policy = NotificationPolicy::from_options(&options);
        for kind in NotificationKind::ALL {
            assert!(policy.is_subscribed(kind), "{kind} not subscribed");
        }
    }
}
