//! Guard against two mutating operations on the same instance at once.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::models::ResourceId;

/// Set of identifiers with a mutating operation in progress.
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<ResourceId>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id`. Returns `None` if another operation already holds it.
    pub fn try_acquire(&self, id: &ResourceId) -> Option<InFlightGuard> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.insert(id.clone()) {
            Some(InFlightGuard {
                id: id.clone(),
                active: Arc::clone(&self.active),
            })
        } else {
            None
        }
    }

    pub fn is_active(&self, id: &ResourceId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }
}

/// Releases its identifier when dropped.
#[derive(Debug)]
pub struct InFlightGuard {
    id: ResourceId,
    active: Arc<Mutex<HashSet<ResourceId>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
