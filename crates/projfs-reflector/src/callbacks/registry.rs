//! Opaque-id registry for instances handed to native code.
//!
//! The engine gives every callback back an instance context pointer. Rather
//! than pointing it at a Rust object, the transport stores a registry id in
//! it and resolves the id on every call.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

/// Maps non-zero ids to shared instances.
pub struct InstanceRegistry<T: ?Sized> {
    next_id: AtomicUsize,
    instances: DashMap<usize, Arc<T>>,
}

impl<T: ?Sized> InstanceRegistry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: AtomicUsize::new(1),
            instances: DashMap::new(),
        }
    }

    /// Register an instance.
    ///
    /// # Returns
    /// A fresh non-zero id.
    pub fn register(&self, instance: Arc<T>) -> usize {
        let id: usize = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.instances.insert(id, instance);
        id
    }

    /// Resolve an id.
    pub fn get(&self, id: usize) -> Option<Arc<T>> {
        self.instances.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove an id.
    ///
    /// # Returns
    /// The instance, if the id was registered.
    pub fn unregister(&self, id: usize) -> Option<Arc<T>> {
        self.instances.remove(&id).map(|(_, instance)| instance)
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Check if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

impl<T: ?Sized> Default for InstanceRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
