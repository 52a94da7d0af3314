//! Provider configuration.

use std::path::PathBuf;

use crate::projection::alignment::MAX_CHUNK_SIZE;
use crate::projection::types::PLACEHOLDER_ID_LENGTH;

/// When an enumeration session adopts the filter passed to a non-restart
/// `GetDirectoryEnumeration` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterCapture {
    /// Adopt the first filter seen if none has been saved yet.
    #[default]
    FirstCall,
    /// Only a restart may set the filter.
    RestartOnly,
}

/// Configuration for the reflector provider.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Layer root (source of truth).
    pub source_root: PathBuf,

    /// Virtualization root shown to applications.
    pub virt_root: PathBuf,

    /// Subscribe to the full notification set.
    pub notifications: bool,

    /// Signal named events for test harnesses. Forces notifications on.
    pub test_mode: bool,

    /// Veto every PreDelete notification.
    pub deny_deletes: bool,

    /// Engine pool thread count (0 = let the engine decide).
    pub pool_thread_count: u32,

    /// Engine concurrent thread count (0 = let the engine decide).
    pub concurrent_thread_count: u32,

    /// Let the engine cache negative path lookups.
    pub enable_negative_path_cache: bool,

    /// Hydration chunk size in bytes (capped at 64 KiB).
    pub chunk_size: usize,

    /// Filter adoption rule for enumeration sessions.
    pub filter_capture: FilterCapture,

    /// Content id stamped on every placeholder.
    pub content_id: Vec<u8>,

    /// Provider id stamped on every placeholder.
    pub provider_id: Vec<u8>,
}

impl ProviderOptions {
    /// Create options for a layer and virtualization root.
    ///
    /// # Arguments
    /// * `source_root` - Layer root directory
    /// * `virt_root` - Virtualization root directory
    pub fn new(source_root: impl Into<PathBuf>, virt_root: impl Into<PathBuf>) -> Self {
        Self {
            source_root: source_root.into(),
            virt_root: virt_root.into(),
            notifications: false,
            test_mode: false,
            deny_deletes: false,
            pool_thread_count: 0,
            concurrent_thread_count: 0,
            enable_negative_path_cache: false,
            chunk_size: MAX_CHUNK_SIZE,
            filter_capture: FilterCapture::default(),
            content_id: vec![0],
            provider_id: vec![1],
        }
    }

    /// Enable or disable the full notification set.
    ///
    /// # Arguments
    /// * `enabled` - Whether to subscribe
    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications = enabled;
        self
    }

    /// Enable or disable test mode.
    ///
    /// # Arguments
    /// * `enabled` - Whether to signal named events
    pub fn with_test_mode(mut self, enabled: bool) -> Self {
        self.test_mode = enabled;
        self
    }

    /// Enable or disable the deny-deletes policy.
    ///
    /// # Arguments
    /// * `enabled` - Whether PreDelete is vetoed
    pub fn with_deny_deletes(mut self, enabled: bool) -> Self {
        self.deny_deletes = enabled;
        self
    }

    /// Set engine thread counts.
    ///
    /// # Arguments
    /// * `pool` - Pool thread count (0 = engine default)
    /// * `concurrent` - Concurrent thread count (0 = engine default)
    pub fn with_thread_counts(mut self, pool: u32, concurrent: u32) -> Self {
        self.pool_thread_count = pool;
        self.concurrent_thread_count = concurrent;
        self
    }

    /// Enable or disable the negative path cache.
    pub fn with_negative_path_cache(mut self, enabled: bool) -> Self {
        self.enable_negative_path_cache = enabled;
        self
    }

    /// Set hydration chunk size, clamped to `1..=64 KiB`.
    ///
    /// # Arguments
    /// * `size` - Chunk size in bytes
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// Set the enumeration filter adoption rule.
    pub fn with_filter_capture(mut self, capture: FilterCapture) -> Self {
        self.filter_capture = capture;
        self
    }

    /// Set placeholder identity tokens, truncated to 128 bytes each.
    ///
    /// # Arguments
    /// * `content_id` - Content id bytes
    /// * `provider_id` - Provider id bytes
    pub fn with_ids(mut self, content_id: &[u8], provider_id: &[u8]) -> Self {
        self.content_id = truncate_id(content_id);
        self.provider_id = truncate_id(provider_id);
        self
    }

    /// Whether the provider subscribes to notifications at all.
    pub fn notifications_enabled(&self) -> bool {
        self.notifications || self.test_mode
    }
}

fn truncate_id(id: &[u8]) -> Vec<u8> {
    id[..id.len().min(PLACEHOLDER_ID_LENGTH)].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ProviderOptions::new("C:\\layer", "C:\\virt");
        assert!(!options.notifications_enabled());
        assert_eq!(options.chunk_size, 64 * 1024);
        assert_eq!(options.content_id, vec![0]);
        assert_eq!(options.provider_id, vec![1]);
        assert_eq!(options.filter_capture, FilterCapture::FirstCall);
    }

    #[test]
    fn test_test_mode_forces_notifications() {
        let options = ProviderOptions::new("a", "b").with_test_mode(true);
        assert!(!options.notifications);
        assert!(options.notifications_enabled());
    }

    #[test]
    fn test_chunk_size_clamped() {
        let options = ProviderOptions::new("a", "b").with_chunk_size(1 << 20);
        assert_eq!(options.chunk_size, 64 * 1024);
        let options = ProviderOptions::new("a", "b").with_chunk_size(0);
        assert_eq!(options.chunk_size, 1);
    }

    #[test]
    fn test_ids_truncated() {
        let long: Vec<u8> = vec![7; 300];
        let options = ProviderOptions::new("a", "b").with_ids(&long, &[9]);
        assert_eq!(options.content_id.len(), 128);
        assert_eq!(options.provider_id, vec![9]);
    }
}
