//! Divergence between a shadow copy and the collection it wraps.
//!
//! Propagating edits apply to both sides, so everything reported here was
//! put there by shadow-only edits:
//! - **Reintroduced**: in the shadow, gone from the live collection
//! - **Hidden**: in the live collection, gone from the shadow

use crate::grouped::{Grouped, GroupedCollection};

/// Elements on which the two views disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence<E> {
    /// Present only in the shadow.
    pub reintroduced: Vec<E>,
    /// Present only in the live collection.
    pub hidden: Vec<E>,
}

impl<E> Divergence<E> {
    /// Returns true if the views hold the same elements.
    pub fn is_empty(&self) -> bool {
        self.reintroduced.is_empty() && self.hidden.is_empty()
    }
    
    /// Total number of disagreeing elements.
    pub fn len(&self) -> usize {
        self.reintroduced.len() + self.hidden.len()
    }
}

impl<E> Default for Divergence<E> {
    fn default() -> Self {
        Self {
            reintroduced: Vec::new(),
            hidden: Vec::new(),
        }
    }
}

/// Computes the divergence of `shadow` from `wrapped`.
pub fn diverge<E: Grouped>(
    shadow: &GroupedCollection<E>,
    wrapped: &GroupedCollection<E>,
) -> Divergence<E> {
    Divergence {
        reintroduced: shadow.iter().filter(|e| !wrapped.contains(e)).cloned().collect(),
        hidden: wrapped.iter().filter(|e| !shadow.contains(e)).cloned().collect(),
    }
}
