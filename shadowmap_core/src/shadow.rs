//! The shadow view: a private, separately editable copy for one traversal.
//!
//! A [`ShadowView`] wraps the live [`Authoritative`] collection and owns an
//! independent copy taken at construction. Two kinds of edits exist:
//!
//! | Call                             | Shadow | Live |
//! |----------------------------------|--------|------|
//! | `add` / `remove`                 | yes    | yes  |
//! | `shadow_add` / `shadow_remove`   | yes    | no   |
//!
//! Reads ask the caller context on every call. The privileged traversal sees
//! the shadow, including its own shadow-only edits; every other caller sees
//! the live collection.
//!
//! There is no rollback. Dropping the view discards all shadow-only edits and
//! leaves the live collection exactly as the propagating edits made it.

use crate::authoritative::{recover, Authoritative};
use crate::divergence::{diverge, Divergence};
use crate::error::ShadowError;
use crate::grouped::{ExportState, Grouped, GroupedCollection};
use shadowmap_env::{CallerContext, CallerRole};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace};

/// Caller-sensitive wrapper around a live collection and its shadow copy.
pub struct ShadowView<E: Grouped, C: CallerContext> {
    wrapped: Authoritative<E>,
    shadow: RwLock<GroupedCollection<E>>,
    context: C,
}

impl<E: Grouped, C: CallerContext> ShadowView<E, C> {
    /// Copies `wrapped` into a new shadow.
    ///
    /// Fails with [`ShadowError::CloneFailure`] if the live collection cannot
    /// produce a consistent copy; no view is created in that case.
    pub fn create(wrapped: Authoritative<E>, context: C) -> Result<Self, ShadowError> {
        let state = wrapped.clone_internal_state()?;
        let shadow = GroupedCollection::from_state(state)?;
        
        debug!(
            elements = shadow.len(),
            groups = shadow.group_count(),
            "shadow view created"
        );
        
        Ok(Self {
            wrapped,
            shadow: RwLock::new(shadow),
            context,
        })
    }
    
    /// Adds `element` to the shadow **and** the live collection.
    ///
    /// Returns the live collection's answer. Both locks are held together,
    /// so no reader ever sees one side updated without the other.
    pub fn add(&self, element: E) -> bool {
        let mut shadow = self.shadow_write();
        let mut wrapped = self.wrapped.write_lock();
        shadow.add(element.clone());
        wrapped.add(element)
    }
    
    /// Removes `element` from the shadow **and** the live collection.
    pub fn remove(&self, element: &E) -> bool {
        let mut shadow = self.shadow_write();
        let mut wrapped = self.wrapped.write_lock();
        shadow.remove(element);
        wrapped.remove(element)
    }
    
    /// Adds `element` to the shadow only.
    ///
    /// Lets the traversal keep an element the live loop has since removed.
    pub fn shadow_add(&self, element: E) -> bool {
        let changed = self.shadow_write().add(element);
        trace!(changed, "shadow-only add");
        changed
    }
    
    /// Removes `element` from the shadow only.
    ///
    /// Hides an element from the traversal without touching the live world.
    pub fn shadow_remove(&self, element: &E) -> bool {
        let changed = self.shadow_write().remove(element);
        trace!(changed, "shadow-only remove");
        changed
    }
    
    /// Runs a batch of shadow-only edits under one shadow write lock.
    ///
    /// Propagating `add` and `remove` take the shadow lock first, so none of
    /// them can land between the edits `f` makes or the reads it returns.
    pub fn edit_shadow<R>(&self, f: impl FnOnce(&mut GroupedCollection<E>) -> R) -> R {
        f(&mut self.shadow_write())
    }
    
    /// Classifies the current caller. Evaluated fresh on every call.
    pub fn role(&self) -> CallerRole {
        self.context.classify()
    }
    
    /// Runs `f` against whichever collection the current caller may see.
    ///
    /// The chosen collection is read-locked while `f` runs; `f` must not call
    /// back into this view's mutating methods.
    pub fn with_view<R>(&self, f: impl FnOnce(&GroupedCollection<E>) -> R) -> R {
        match self.role() {
            CallerRole::Privileged => f(&self.shadow_read()),
            CallerRole::Normal => self.wrapped.with(f),
        }
    }
    
    /// Iterates the members visible to the current caller.
    ///
    /// The iterator is a snapshot taken at call time: later edits are not
    /// reflected, and the caller may edit the view while iterating.
    pub fn iter(&self) -> std::vec::IntoIter<E> {
        self.with_view(|c| c.iter().cloned().collect::<Vec<_>>())
            .into_iter()
    }
    
    /// Snapshot of group `key` as visible to the current caller.
    pub fn group(&self, key: &E::Key) -> Vec<E> {
        self.with_view(|c| c.group(key).cloned().collect())
    }
    
    pub fn contains(&self, element: &E) -> bool {
        self.with_view(|c| c.contains(element))
    }
    
    pub fn len(&self) -> usize {
        self.with_view(GroupedCollection::len)
    }
    
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    
    /// Elements on which the shadow and the live collection disagree.
    ///
    /// Independent of the caller's role.
    pub fn divergence(&self) -> Divergence<E> {
        let shadow = self.shadow_read();
        let wrapped = self.wrapped.read_lock();
        diverge(&shadow, &wrapped)
    }
    
    /// The live collection this view wraps.
    pub fn wrapped(&self) -> &Authoritative<E> {
        &self.wrapped
    }
    
    pub fn context(&self) -> &C {
        &self.context
    }
    
    /// Discards the shadow and hands back the live handle.
    pub fn into_wrapped(self) -> Authoritative<E> {
        debug!(
            shadow_len = self.shadow_read().len(),
            wrapped_len = self.wrapped.len(),
            "shadow view discarded"
        );
        self.wrapped
    }
    
    fn shadow_read(&self) -> RwLockReadGuard<'_, GroupedCollection<E>> {
        recover(self.shadow.read())
    }
    
    // Lock order: shadow before wrapped
    fn shadow_write(&self) -> RwLockWriteGuard<'_, GroupedCollection<E>> {
        recover(self.shadow.write())
    }
}

impl<E: Grouped, C: CallerContext + std::fmt::Debug> std::fmt::Debug for ShadowView<E, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowView")
            .field("shadow_len", &self.shadow_read().len())
            .field("wrapped_len", &self.wrapped.len())
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouped::tests::{t, Tagged};
    use shadowmap_env::{enter, scope, FixedContext, ScopedContext, SubsystemId};
    use std::sync::Arc;
    
    fn sorted(mut v: Vec<Tagged>) -> Vec<Tagged> {
        v.sort();
        v
    }
    
    fn live(elements: &[Tagged]) -> Authoritative<Tagged> {
        elements.iter().copied().collect::<GroupedCollection<_>>().into()
    }
    
    #[test]
    fn test_snapshot_equality_at_creation() {
        let wrapped = live(&[t(1, 'x'), t(2, 'y'), t(3, 'x')]);
        let view = ShadowView::create(wrapped.clone(), FixedContext::privileged()).unwrap();
        
        for key in ['x', 'y', 'z'] {
            assert_eq!(sorted(view.group(&key)), sorted(wrapped.group_members(&key)));
        }
        assert_eq!(sorted(view.iter().collect()), sorted(wrapped.members()));
        assert!(view.divergence().is_empty());
    }
    
    #[test]
    fn test_shadow_is_independent_of_later_live_edits() {
        let wrapped = live(&[t(1, 'x')]);
        let view = ShadowView::create(wrapped.clone(), FixedContext::privileged()).unwrap();
        
        // Direct edit, bypassing the view
        wrapped.add(t(2, 'y'));
        
        assert_eq!(view.iter().collect::<Vec<_>>(), vec![t(1, 'x')]);
        assert_eq!(view.divergence().hidden, vec![t(2, 'y')]);
    }
    
    #[test]
    fn test_propagating_edits_hit_both_views() {
        let wrapped = live(&[t(1, 'x')]);
        let view = ShadowView::create(wrapped.clone(), FixedContext::normal()).unwrap();
        
        assert!(view.add(t(2, 'y')));
        assert!(view.remove(&t(1, 'x')));
        
        assert_eq!(wrapped.members(), vec![t(2, 'y')]);
        assert!(view.divergence().is_empty());
    }
    
    #[test]
    fn test_shadow_edits_leave_live_untouched() {
        let wrapped = live(&[t(1, 'x'), t(2, 'y')]);
        let view = ShadowView::create(wrapped.clone(), FixedContext::privileged()).unwrap();
        
        assert!(view.shadow_remove(&t(1, 'x')));
        assert!(view.shadow_add(t(3, 'z')));
        
        assert_eq!(sorted(wrapped.members()), vec![t(1, 'x'), t(2, 'y')]);
        assert_eq!(sorted(view.iter().collect()), vec![t(2, 'y'), t(3, 'z')]);
        
        let d = view.divergence();
        assert_eq!(d.reintroduced, vec![t(3, 'z')]);
        assert_eq!(d.hidden, vec![t(1, 'x')]);
    }
    
    #[test]
    fn test_membership_ops_are_idempotent() {
        let view = ShadowView::create(Authoritative::new(), FixedContext::normal()).unwrap();
        
        assert!(view.add(t(1, 'x')));
        assert!(!view.add(t(1, 'x')));
        assert!(view.remove(&t(1, 'x')));
        assert!(!view.remove(&t(1, 'x')));
        
        assert!(view.shadow_add(t(2, 'x')));
        assert!(!view.shadow_add(t(2, 'x')));
        assert!(!view.shadow_remove(&t(9, 'x')));
    }
    
    #[test]
    fn test_add_reports_live_result() {
        let wrapped = Authoritative::new();
        let view = ShadowView::create(wrapped.clone(), FixedContext::normal()).unwrap();
        
        // Present in the shadow only; the live collection still changes
        view.shadow_add(t(1, 'x'));
        assert!(view.add(t(1, 'x')));
        
        // Present live only; the live collection does not change
        wrapped.add(t(2, 'y'));
        assert!(!view.add(t(2, 'y')));
    }
    
    #[test]
    fn test_reintroduce_scenario() {
        let saver = SubsystemId::from_seed(1);
        let a = t(1, 'x');
        let b = t(2, 'y');
        
        let wrapped = live(&[a, b]);
        let view = ShadowView::create(wrapped.clone(), ScopedContext::for_subsystem(saver)).unwrap();
        
        // Live loop removes A
        assert!(view.remove(&a));
        assert_eq!(wrapped.members(), vec![b]);
        {
            let _guard = enter(saver);
            assert_eq!(view.iter().collect::<Vec<_>>(), vec![b]);
            
            // Traversal puts A back for itself
            assert!(view.shadow_add(a));
            assert_eq!(sorted(view.iter().collect()), vec![a, b]);
            assert_eq!(view.group(&'x'), vec![a]);
        }
        
        assert_eq!(wrapped.members(), vec![b]);
        assert!(view.group(&'x').is_empty());
        assert_eq!(view.iter().collect::<Vec<_>>(), vec![b]);
    }
    
    #[test]
    fn test_dispatch_is_evaluated_per_call() {
        let saver = SubsystemId::from_seed(1);
        let wrapped = live(&[t(1, 'x')]);
        let view = ShadowView::create(wrapped, ScopedContext::for_subsystem(saver)).unwrap();
        view.shadow_remove(&t(1, 'x'));
        
        assert_eq!(view.role(), CallerRole::Normal);
        assert_eq!(view.len(), 1);
        
        let guard = enter(saver);
        assert_eq!(view.role(), CallerRole::Privileged);
        assert_eq!(view.len(), 0);
        assert!(!view.contains(&t(1, 'x')));
        drop(guard);
        
        assert_eq!(view.len(), 1);
        assert!(view.contains(&t(1, 'x')));
    }
    
    #[test]
    fn test_drop_discards_shadow_edits() {
        let wrapped = live(&[t(1, 'x')]);
        let view = ShadowView::create(wrapped.clone(), FixedContext::privileged()).unwrap();
        
        view.shadow_remove(&t(1, 'x'));
        view.shadow_add(t(5, 'q'));
        view.add(t(2, 'y'));
        
        let handle = view.into_wrapped();
        assert!(handle.ptr_eq(&wrapped));
        assert_eq!(sorted(wrapped.members()), vec![t(1, 'x'), t(2, 'y')]);
    }
    
    #[test]
    fn test_edit_shadow_batches_without_touching_live() {
        let wrapped = live(&[t(1, 'x'), t(2, 'x')]);
        let view = ShadowView::create(wrapped.clone(), FixedContext::privileged()).unwrap();
        
        let group = view.edit_shadow(|shadow| {
            shadow.remove(&t(1, 'x'));
            shadow.add(t(3, 'x'));
            let mut group: Vec<Tagged> = shadow.group(&'x').copied().collect();
            group.sort();
            group
        });
        
        assert_eq!(group, vec![t(2, 'x'), t(3, 'x')]);
        assert_eq!(sorted(wrapped.members()), vec![t(1, 'x'), t(2, 'x')]);
        assert_eq!(sorted(view.group(&'x')), vec![t(2, 'x'), t(3, 'x')]);
    }
    
    #[test]
    fn test_edit_shadow_excludes_concurrent_propagating_edits() {
        let wrapped = live(&[t(1, 'x')]);
        let view = Arc::new(ShadowView::create(wrapped.clone(), FixedContext::privileged()).unwrap());
        let (started_tx, started_rx) = std::sync::mpsc::channel();
        
        let (seen, live_during_batch, writer) = view.edit_shadow(|shadow| {
            let writer = {
                let view = Arc::clone(&view);
                std::thread::spawn(move || {
                    started_tx.send(()).unwrap();
                    view.add(t(2, 'x'));
                })
            };
            started_rx.recv().unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
            
            // The writer is blocked on the shadow lock this batch holds
            (shadow.group_len(&'x'), wrapped.contains(&t(2, 'x')), writer)
        });
        writer.join().unwrap();
        
        assert_eq!(seen, 1);
        assert!(!live_during_batch);
        assert!(wrapped.contains(&t(2, 'x')));
        assert_eq!(view.group(&'x').len(), 2);
    }
    
    #[test]
    fn test_create_fails_on_poisoned_live_collection() {
        let wrapped = live(&[t(1, 'x')]);
        let poisoner = wrapped.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.write_lock();
            panic!("live loop died mid-mutation");
        })
        .join();
        
        let result = ShadowView::create(wrapped, FixedContext::privileged());
        assert!(matches!(result, Err(ShadowError::CloneFailure(_))));
    }
    
    #[test]
    fn test_traversal_thread_reads_shadow_while_live_thread_mutates() {
        let saver = SubsystemId::from_seed(1);
        let initial: Vec<Tagged> = (0..100).map(|i| t(i, if i % 2 == 0 { 'e' } else { 'o' })).collect();
        let wrapped = live(&initial);
        let view = Arc::new(
            ShadowView::create(wrapped.clone(), ScopedContext::for_subsystem(saver)).unwrap(),
        );
        
        let traversal = {
            let view = Arc::clone(&view);
            std::thread::spawn(move || {
                let _guard = enter(saver);
                let mut visited = 0;
                for element in view.iter() {
                    // Hide what was visited so a second pass skips it
                    view.shadow_remove(&element);
                    visited += 1;
                }
                (visited, view.len())
            })
        };
        
        for i in 0..100 {
            view.remove(&t(i, if i % 2 == 0 { 'e' } else { 'o' }));
            view.add(t(1000 + i, 'n'));
        }
        
        let (visited, remaining) = traversal.join().unwrap();
        assert!(visited <= 200);
        assert!(remaining <= 100);
        
        let mut expected: Vec<Tagged> = (0..100).map(|i| t(1000 + i, 'n')).collect();
        expected.sort();
        assert_eq!(sorted(wrapped.members()), expected);
    }
    
    #[tokio::test]
    async fn test_task_scope_sees_shadow() {
        let saver = SubsystemId::from_seed(1);
        let wrapped = live(&[t(1, 'x')]);
        let view = Arc::new(
            ShadowView::create(wrapped, ScopedContext::for_subsystem(saver)).unwrap(),
        );
        view.shadow_add(t(2, 'x'));
        
        let traversal_view = Arc::clone(&view);
        let seen = scope(saver, async move {
            tokio::task::yield_now().await;
            traversal_view.group(&'x').len()
        })
        .await;
        
        assert_eq!(seen, 2);
        assert_eq!(view.group(&'x').len(), 1);
    }
}
