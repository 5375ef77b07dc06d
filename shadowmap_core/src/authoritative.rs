//! Shared handle to the live, authoritative collection.

use crate::error::ShadowError;
use crate::grouped::{ExportState, GroupState, Grouped, GroupedCollection};
use std::sync::{Arc, LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// The ground-truth collection owned by the live loop.
///
/// Cloning the handle shares the collection. Each structural mutation holds
/// the write lock for that one call only; nothing here blocks for the length
/// of a traversal.
pub struct Authoritative<E: Grouped> {
    inner: Arc<RwLock<GroupedCollection<E>>>,
}

impl<E: Grouped> Authoritative<E> {
    /// Creates an empty authoritative collection.
    pub fn new() -> Self {
        Self::from_collection(GroupedCollection::new())
    }
    
    /// Takes ownership of an existing collection.
    pub fn from_collection(collection: GroupedCollection<E>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(collection)),
        }
    }
    
    /// Inserts `element`. Returns whether the set changed.
    pub fn add(&self, element: E) -> bool {
        self.write_lock().add(element)
    }
    
    /// Removes `element`. Returns whether the set changed.
    pub fn remove(&self, element: &E) -> bool {
        self.write_lock().remove(element)
    }
    
    pub fn contains(&self, element: &E) -> bool {
        self.read_lock().contains(element)
    }
    
    pub fn len(&self) -> usize {
        self.read_lock().len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.read_lock().is_empty()
    }
    
    /// Snapshot of all members.
    pub fn members(&self) -> Vec<E> {
        self.read_lock().iter().cloned().collect()
    }
    
    /// Snapshot of the members of group `key`.
    pub fn group_members(&self, key: &E::Key) -> Vec<E> {
        self.read_lock().group(key).cloned().collect()
    }
    
    /// Runs `f` against the collection under the read lock.
    ///
    /// `f` must not mutate through this handle or any view wrapping it.
    pub fn with<R>(&self, f: impl FnOnce(&GroupedCollection<E>) -> R) -> R {
        f(&self.read_lock())
    }
    
    /// Returns true if both handles share one collection.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
    
    pub(crate) fn read_lock(&self) -> RwLockReadGuard<'_, GroupedCollection<E>> {
        recover(self.inner.read())
    }
    
    pub(crate) fn write_lock(&self) -> RwLockWriteGuard<'_, GroupedCollection<E>> {
        recover(self.inner.write())
    }
}

/// Membership calls are total, so a lock poisoned by a panicking writer is
/// reused rather than reported.
pub(crate) fn recover<G>(result: LockResult<G>) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!("recovering poisoned collection lock");
        poisoned.into_inner()
    })
}

impl<E: Grouped> Clone for Authoritative<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Grouped> Default for Authoritative<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Grouped + std::fmt::Debug> std::fmt::Debug for Authoritative<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authoritative")
            .field("len", &self.len())
            .finish()
    }
}

impl<E: Grouped> ExportState<E> for Authoritative<E> {
    /// Fails if a writer panicked mid-mutation: the copy could be torn.
    fn clone_internal_state(&self) -> Result<GroupState<E>, ShadowError> {
        let collection = self.inner.read().map_err(|_| {
            ShadowError::clone_failure("authoritative collection lock is poisoned")
        })?;
        collection.clone_internal_state()
    }
}

impl<E: Grouped> From<GroupedCollection<E>> for Authoritative<E> {
    fn from(collection: GroupedCollection<E>) -> Self {
        Self::from_collection(collection)
    }
}
