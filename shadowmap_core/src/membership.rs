//! The capability interface shared by the live collection and shadow views.

use crate::authoritative::Authoritative;
use crate::grouped::Grouped;
use crate::shadow::ShadowView;
use shadowmap_env::CallerContext;
use std::sync::Arc;

/// Add, remove, iterate and group lookup through a shared reference.
///
/// Written against this trait, the live loop runs unchanged whether it holds
/// the authoritative handle directly or a [`ShadowView`] wrapping it.
pub trait Membership<E: Grouped> {
    fn add(&self, element: E) -> bool;
    
    fn remove(&self, element: &E) -> bool;
    
    fn contains(&self, element: &E) -> bool;
    
    /// Snapshot of every member visible to the caller.
    fn members(&self) -> Vec<E>;
    
    /// Snapshot of group `key` as visible to the caller.
    fn group_members(&self, key: &E::Key) -> Vec<E>;
    
    fn len(&self) -> usize;
    
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: Grouped> Membership<E> for Authoritative<E> {
    fn add(&self, element: E) -> bool {
        Authoritative::add(self, element)
    }
    
    fn remove(&self, element: &E) -> bool {
        Authoritative::remove(self, element)
    }
    
    fn contains(&self, element: &E) -> bool {
        Authoritative::contains(self, element)
    }
    
    fn members(&self) -> Vec<E> {
        Authoritative::members(self)
    }
    
    fn group_members(&self, key: &E::Key) -> Vec<E> {
        Authoritative::group_members(self, key)
    }
    
    fn len(&self) -> usize {
        Authoritative::len(self)
    }
}

impl<E: Grouped, C: CallerContext> Membership<E> for ShadowView<E, C> {
    fn add(&self, element: E) -> bool {
        ShadowView::add(self, element)
    }
    
    fn remove(&self, element: &E) -> bool {
        ShadowView::remove(self, element)
    }
    
    fn contains(&self, element: &E) -> bool {
        ShadowView::contains(self, element)
    }
    
    fn members(&self) -> Vec<E> {
        ShadowView::iter(self).collect()
    }
    
    fn group_members(&self, key: &E::Key) -> Vec<E> {
        ShadowView::group(self, key)
    }
    
    fn len(&self) -> usize {
        ShadowView::len(self)
    }
}

impl<E: Grouped, M: Membership<E> + ?Sized> Membership<E> for Arc<M> {
    fn add(&self, element: E) -> bool {
        (**self).add(element)
    }
    
    fn remove(&self, element: &E) -> bool {
        (**self).remove(element)
    }
    
    fn contains(&self, element: &E) -> bool {
        (**self).contains(element)
    }
    
    fn members(&self) -> Vec<E> {
        (**self).members()
    }
    
    fn group_members(&self, key: &E::Key) -> Vec<E> {
        (**self).group_members(key)
    }
    
    fn len(&self) -> usize {
        (**self).len()
    }
}
