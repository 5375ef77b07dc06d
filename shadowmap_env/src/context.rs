//! Core caller-context trait for ShadowMap readers.

use crate::types::CallerRole;
use std::sync::Arc;

/// Classifies the current caller as privileged or normal.
///
/// A shadow view asks its context on **every** read; implementations must
/// not cache the answer between calls.
///
/// # Implementations
///
/// - **Explicit**: `FixedContext` - a role decided by whoever built the view
/// - **Scoped**: `ScopedContext` - thread-local / task-local traversal frames
pub trait CallerContext: Send + Sync + 'static {
    /// Returns the role of whoever is calling right now.
    fn classify(&self) -> CallerRole;
}

impl<C: CallerContext + ?Sized> CallerContext for Arc<C> {
    fn classify(&self) -> CallerRole {
        (**self).classify()
    }
}

impl<C: CallerContext + ?Sized> CallerContext for Box<C> {
    fn classify(&self) -> CallerRole {
        (**self).classify()
    }
}

/// A context that always answers the same role.
///
/// This is the explicit form of the capability: the caller that builds the
/// view decides up front which side of the split it is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedContext(pub CallerRole);

impl FixedContext {
    pub fn privileged() -> Self {
        Self(CallerRole::Privileged)
    }
    
    pub fn normal() -> Self {
        Self(CallerRole::Normal)
    }
}

impl CallerContext for FixedContext {
    fn classify(&self) -> CallerRole {
        self.0
    }
}
