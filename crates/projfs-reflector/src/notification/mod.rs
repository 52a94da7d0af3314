//! Notification dispatch and policy.

mod dispatcher;
mod policy;
pub mod signal;
mod types;

pub use dispatcher::NotificationDispatcher;
pub use policy::{AllowAll, DenyDeletes, NotificationPolicy, OperationPolicy};
pub use signal::{EventSignaller, NamedEventSignaller, TestModeSignal, PROVIDER_TEST_PROCEED};
pub use types::{NotificationEvent, NotificationKind, NotificationOutcome, NotificationType};
