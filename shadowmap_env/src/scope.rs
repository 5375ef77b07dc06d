//! Traversal scopes: explicit, scoped replacement for call-stack inspection.
//!
//! A privileged subsystem marks the extent of its traversal by pushing a
//! frame carrying its [`SubsystemId`]. [`ScopedContext::classify`] walks the
//! frames that are active *right now* and answers `Privileged` when any of
//! them satisfies the configured predicate.
//!
//! Two frame stacks exist:
//!
//! - **Thread frames** via [`enter`]. The returned guard pops the frame on
//!   drop (including unwinding). It is `!Send` and must not be held across
//!   an `.await`: on a runtime that interleaves tasks on one thread, every
//!   task on that thread would be classified privileged.
//! - **Task frames** via [`scope`]. Backed by a tokio task-local, so the frame
//!   follows the task between worker threads and ends with the future
//!   (completion, panic, or cancellation).

use crate::context::CallerContext;
use crate::types::{CallerRole, SubsystemId};
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

thread_local! {
    static THREAD_FRAMES: RefCell<Vec<SubsystemId>> = const { RefCell::new(Vec::new()) };
}

tokio::task_local! {
    static TASK_FRAMES: Vec<SubsystemId>;
}

/// Pushes a thread-local traversal frame for `subsystem`.
///
/// The frame stays active until the returned guard is dropped.
#[must_use = "the traversal frame is popped as soon as the guard is dropped"]
pub fn enter(subsystem: SubsystemId) -> TraversalGuard {
    THREAD_FRAMES.with(|frames| frames.borrow_mut().push(subsystem));
    TraversalGuard {
        subsystem,
        _not_send: PhantomData,
    }
}

/// Runs `future` with a task-local traversal frame for `subsystem`.
///
/// Nested scopes stack; tasks spawned from inside the scope do not inherit it.
pub async fn scope<F: Future>(subsystem: SubsystemId, future: F) -> F::Output {
    let mut frames = TASK_FRAMES.try_with(|f| f.clone()).unwrap_or_default();
    frames.push(subsystem);
    TASK_FRAMES.scope(frames, future).await
}

/// Returns the frames active in the current execution context.
///
/// Task frames come first (outermost to innermost), then thread frames.
pub fn active_frames() -> Vec<SubsystemId> {
    let mut frames = TASK_FRAMES.try_with(|f| f.clone()).unwrap_or_default();
    let _ = THREAD_FRAMES.try_with(|f| frames.extend(f.borrow().iter().copied()));
    frames
}

fn any_frame(mut predicate: impl FnMut(&SubsystemId) -> bool) -> bool {
    let in_task = TASK_FRAMES
        .try_with(|frames| frames.iter().any(&mut predicate))
        .unwrap_or(false);
    in_task
        || THREAD_FRAMES
            .try_with(|frames| frames.borrow().iter().any(&mut predicate))
            .unwrap_or(false)
}

/// Guard for a thread-local traversal frame. Pops the frame on drop.
#[derive(Debug)]
pub struct TraversalGuard {
    subsystem: SubsystemId,
    _not_send: PhantomData<*const ()>,
}

impl Drop for TraversalGuard {
    fn drop(&mut self) {
        // try_with: the thread may already be tearing down its locals
        let _ = THREAD_FRAMES.try_with(|frames| {
            let mut frames = frames.borrow_mut();
            if frames.last() == Some(&self.subsystem) {
                frames.pop();
            } else if let Some(pos) = frames.iter().rposition(|f| *f == self.subsystem) {
                warn!(
                    subsystem = %self.subsystem,
                    depth = frames.len(),
                    "traversal guard dropped out of order"
                );
                frames.remove(pos);
            }
        });
    }
}

/// Caller context answering from the active traversal frames.
///
/// The predicate identifies the privileged subsystem and must be stable for
/// the lifetime of any view built on this context.
#[derive(Clone)]
pub struct ScopedContext {
    predicate: Arc<dyn Fn(&SubsystemId) -> bool + Send + Sync>,
}

impl ScopedContext {
    /// Creates a context with an arbitrary privileged-subsystem predicate.
    pub fn new<P>(predicate: P) -> Self
    where
        P: Fn(&SubsystemId) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }
    
    /// Creates a context that treats exactly one subsystem as privileged.
    pub fn for_subsystem(subsystem: SubsystemId) -> Self {
        Self::new(move |frame| *frame == subsystem)
    }
}

impl std::fmt::Debug for ScopedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedContext").finish_non_exhaustive()
    }
}

impl CallerContext for ScopedContext {
    fn classify(&self) -> CallerRole {
        if any_frame(|frame| (self.predicate)(frame)) {
            CallerRole::Privileged
        } else {
            CallerRole::Normal
        }
    }
}
