//! The grouped membership collection.
//!
//! A set of elements plus a derived index from group key to the elements of
//! that group. The index is never edited directly; `add` and `remove` keep it
//! consistent with the element set:
//!
//! - every element sits in exactly one bucket, `index[group_key(e)]`
//! - every bucket is a subset of the element set
//! - empty buckets are pruned

use crate::error::ShadowError;
use std::collections::{hash_map, hash_set, HashMap, HashSet};
use std::hash::Hash;

/// An element that belongs to exactly one group.
///
/// Equality and hashing define identity. The group key must not change while
/// the element is a member of any collection.
pub trait Grouped: Clone + Eq + Hash {
    /// Classification used to bucket elements (a kind, tag, or type id).
    type Key: Clone + Eq + Hash + std::fmt::Debug;
    
    /// Returns the group this element belongs to.
    fn group_key(&self) -> Self::Key;
}

/// Raw exported state of a grouped collection.
///
/// Produced by [`ExportState::clone_internal_state`] and validated by
/// [`GroupedCollection::from_state`].
#[derive(Debug, Clone)]
pub struct GroupState<E: Grouped> {
    pub elements: HashSet<E>,
    pub index: HashMap<E::Key, HashSet<E>>,
}

/// First-class export of a collection's internal state.
///
/// Implementors must return a value-independent copy: later mutation of the
/// source must not be visible through the returned state.
pub trait ExportState<E: Grouped> {
    fn clone_internal_state(&self) -> Result<GroupState<E>, ShadowError>;
}

/// A set-backed, group-indexed multi-map.
#[derive(Debug, Clone)]
pub struct GroupedCollection<E: Grouped> {
    elements: HashSet<E>,
    index: HashMap<E::Key, HashSet<E>>,
}

impl<E: Grouped> GroupedCollection<E> {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self {
            elements: HashSet::new(),
            index: HashMap::new(),
        }
    }
    
    /// Rebuilds a collection from exported state, checking the index against
    /// the element set.
    pub fn from_state(state: GroupState<E>) -> Result<Self, ShadowError> {
        let GroupState { elements, mut index } = state;
        
        index.retain(|_, bucket| !bucket.is_empty());
        
        let mut indexed = 0;
        for (key, bucket) in &index {
            for element in bucket {
                // Check the element set's copy, since identity may not cover the key
                let Some(stored) = elements.get(element) else {
                    return Err(ShadowError::clone_failure(format!(
                        "group {:?} holds an element missing from the element set",
                        key
                    )));
                };
                if stored.group_key() != *key {
                    return Err(ShadowError::clone_failure(format!(
                        "element filed under group {:?} but belongs to {:?}",
                        key,
                        stored.group_key()
                    )));
                }
            }
            indexed += bucket.len();
        }
        
        // Buckets are disjoint by key, so equal counts means full coverage
        if indexed != elements.len() {
            return Err(ShadowError::clone_failure(format!(
                "index covers {} of {} elements",
                indexed,
                elements.len()
            )));
        }
        
        Ok(Self { elements, index })
    }
    
    /// Inserts `element` if absent. Returns whether the set changed.
    pub fn add(&mut self, element: E) -> bool {
        if self.elements.contains(&element) {
            return false;
        }
        self.index
            .entry(element.group_key())
            .or_default()
            .insert(element.clone());
        self.elements.insert(element)
    }
    
    /// Removes `element` if present. Returns whether the set changed.
    pub fn remove(&mut self, element: &E) -> bool {
        // Use the stored element's key, not the caller's copy
        let Some(stored) = self.elements.take(element) else {
            return false;
        };
        
        if let hash_map::Entry::Occupied(mut bucket) = self.index.entry(stored.group_key()) {
            bucket.get_mut().remove(&stored);
            if bucket.get().is_empty() {
                bucket.remove();
            }
        }
        true
    }
    
    pub fn contains(&self, element: &E) -> bool {
        self.elements.contains(element)
    }
    
    pub fn len(&self) -> usize {
        self.elements.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
    
    /// Iterates all elements, in no particular order.
    pub fn iter(&self) -> hash_set::Iter<'_, E> {
        self.elements.iter()
    }
    
    /// Iterates the members of group `key`. Empty if the group has none.
    ///
    /// The iterator borrows the collection, so it always reflects the
    /// collection as it is while the borrow lives.
    pub fn group<'a>(&'a self, key: &E::Key) -> impl Iterator<Item = &'a E> + 'a {
        self.index.get(key).into_iter().flatten()
    }
    
    /// Number of members in group `key`.
    pub fn group_len(&self, key: &E::Key) -> usize {
        self.index.get(key).map_or(0, HashSet::len)
    }
    
    /// Keys of all non-empty groups.
    pub fn keys(&self) -> impl Iterator<Item = &E::Key> + '_ {
        self.index.keys()
    }
    
    /// Number of non-empty groups.
    pub fn group_count(&self) -> usize {
        self.index.len()
    }
    
    /// Removes every element.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.index.clear();
    }
}

impl<E: Grouped> Default for GroupedCollection<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Grouped> PartialEq for GroupedCollection<E> {
    fn eq(&self, other: &Self) -> bool {
        // The index is derived, so the element sets decide
        self.elements == other.elements
    }
}

impl<E: Grouped> Eq for GroupedCollection<E> {}

impl<E: Grouped> ExportState<E> for GroupedCollection<E> {
    fn clone_internal_state(&self) -> Result<GroupState<E>, ShadowError> {
        Ok(GroupState {
            elements: self.elements.clone(),
            index: self.index.clone(),
        })
    }
}

impl<E: Grouped> Extend<E> for GroupedCollection<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        for element in iter {
            self.add(element);
        }
    }
}

impl<E: Grouped> FromIterator<E> for GroupedCollection<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut collection = Self::new();
        collection.extend(iter);
        collection
    }
}

impl<'a, E: Grouped> IntoIterator for &'a GroupedCollection<E> {
    type Item = &'a E;
    type IntoIter = hash_set::Iter<'a, E>;
    
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    
    /// Test element: identity is `id`, group is `tag`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub(crate) struct Tagged {
        pub id: u32,
        pub tag: char,
    }
    
    impl Grouped for Tagged {
        type Key = char;
        
        fn group_key(&self) -> char {
            self.tag
        }
    }
    
    pub(crate) fn t(id: u32, tag: char) -> Tagged {
        Tagged { id, tag }
    }
    
    fn sorted<'a>(it: impl Iterator<Item = &'a Tagged>) -> Vec<Tagged> {
        let mut v: Vec<Tagged> = it.copied().collect();
        v.sort();
        v
    }
    
    #[test]
    fn test_add_is_idempotent() {
        let mut c = GroupedCollection::new();
        assert!(c.add(t(1, 'x')));
        assert!(!c.add(t(1, 'x')));
        assert_eq!(c.len(), 1);
        assert_eq!(c.group_len(&'x'), 1);
    }
    
    #[test]
    fn test_remove_absent_returns_false() {
        let mut c: GroupedCollection<Tagged> = GroupedCollection::new();
        assert!(!c.remove(&t(1, 'x')));
        
        c.add(t(1, 'x'));
        assert!(c.remove(&t(1, 'x')));
        assert!(!c.remove(&t(1, 'x')));
        assert!(c.is_empty());
    }
    
    #[test]
    fn test_groups_partition_elements() {
        let c: GroupedCollection<Tagged> =
            [t(1, 'x'), t(2, 'y'), t(3, 'x')].into_iter().collect();
        
        assert_eq!(sorted(c.group(&'x')), vec![t(1, 'x'), t(3, 'x')]);
        assert_eq!(sorted(c.group(&'y')), vec![t(2, 'y')]);
        assert_eq!(c.group(&'z').count(), 0);
        assert_eq!(c.group_count(), 2);
    }
    
    #[test]
    fn test_empty_groups_are_pruned() {
        let mut c = GroupedCollection::new();
        c.add(t(1, 'x'));
        c.remove(&t(1, 'x'));
        
        assert_eq!(c.group_count(), 0);
        assert_eq!(c.keys().count(), 0);
    }
    
    #[test]
    fn test_from_state_roundtrip_is_independent() {
        let mut original: GroupedCollection<Tagged> =
            [t(1, 'x'), t(2, 'y')].into_iter().collect();
        
        let copy = GroupedCollection::from_state(original.clone_internal_state().unwrap()).unwrap();
        original.remove(&t(1, 'x'));
        
        assert!(copy.contains(&t(1, 'x')));
        assert_eq!(copy.len(), 2);
        assert_eq!(original.len(), 1);
    }
    
    #[test]
    fn test_from_state_rejects_unindexed_element() {
        let mut state = GroupState {
            elements: HashSet::new(),
            index: HashMap::new(),
        };
        state.elements.insert(t(1, 'x'));
        
        let err = GroupedCollection::from_state(state).unwrap_err();
        assert!(matches!(err, ShadowError::CloneFailure(_)));
    }
    
    #[test]
    fn test_from_state_rejects_misfiled_element() {
        let mut state = GroupState {
            elements: HashSet::new(),
            index: HashMap::new(),
        };
        state.elements.insert(t(1, 'x'));
        state.index.entry('y').or_default().insert(t(1, 'x'));
        
        assert!(GroupedCollection::from_state(state).is_err());
    }
    
    /// Identity is `id` alone, so two copies can disagree on the group.
    #[derive(Debug, Clone, Copy)]
    struct Loose {
        id: u32,
        tag: char,
    }
    
    impl PartialEq for Loose {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }
    
    impl Eq for Loose {}
    
    impl Hash for Loose {
        fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }
    
    impl Grouped for Loose {
        type Key = char;
        
        fn group_key(&self) -> char {
            self.tag
        }
    }
    
    #[test]
    fn test_from_state_checks_stored_copy_key() {
        let mut state = GroupState {
            elements: HashSet::new(),
            index: HashMap::new(),
        };
        state.elements.insert(Loose { id: 1, tag: 'x' });
        state.index.entry('y').or_default().insert(Loose { id: 1, tag: 'y' });
        
        let err = GroupedCollection::from_state(state).unwrap_err();
        assert!(matches!(err, ShadowError::CloneFailure(_)));
    }
    
    #[test]
    fn test_from_state_accepts_matching_stored_copy() {
        let mut state = GroupState {
            elements: HashSet::new(),
            index: HashMap::new(),
        };
        state.elements.insert(Loose { id: 1, tag: 'x' });
        state.index.entry('x').or_default().insert(Loose { id: 1, tag: 'x' });
        
        let mut c = GroupedCollection::from_state(state).unwrap();
        assert!(c.remove(&Loose { id: 1, tag: 'x' }));
        assert_eq!(c.group_count(), 0);
    }
    
    #[test]
    fn test_from_state_rejects_dangling_bucket_member() {
        let mut state: GroupState<Tagged> = GroupState {
            elements: HashSet::new(),
            index: HashMap::new(),
        };
        state.index.entry('x').or_default().insert(t(1, 'x'));
        
        assert!(GroupedCollection::from_state(state).is_err());
    }
    
    #[test]
    fn test_from_state_drops_empty_buckets() {
        let mut state: GroupState<Tagged> = GroupState {
            elements: HashSet::new(),
            index: HashMap::new(),
        };
        state.index.insert('x', HashSet::new());
        
        let c = GroupedCollection::from_state(state).unwrap();
        assert_eq!(c.group_count(), 0);
    }
    
    #[test]
    fn test_equality_ignores_insertion_order() {
        let a: GroupedCollection<Tagged> = [t(1, 'x'), t(2, 'y')].into_iter().collect();
        let b: GroupedCollection<Tagged> = [t(2, 'y'), t(1, 'x')].into_iter().collect();
        assert_eq!(a, b);
    }
}
