//! ShadowMap Caller-Context Layer
//!
//! This crate answers one question for a shadow view on every read:
//! **who is calling?** The background traversal (privileged) reads the
//! shadow copy; everyone else (normal) reads the live collection.
//!
//! # Core Concept: Explicit Traversal Scopes
//!
//! Instead of inspecting the call stack, the privileged subsystem marks the
//! extent of its traversal:
//! - Threads: [`enter`] returns a guard that clears the frame on drop
//! - Async tasks: [`scope`] wraps the traversal future in a task-local frame
//!
//! # Example
//!
//! ```ignore
//! use shadowmap_env::{scope, CallerContext, ScopedContext, SubsystemId};
//!
//! let saver = SubsystemId::new();
//! let ctx = ScopedContext::for_subsystem(saver);
//!
//! scope(saver, async {
//!     // every read through a view built on `ctx` sees the shadow copy here
//! })
//! .await;
//! ```

mod context;
mod scope;
mod types;

pub use context::{CallerContext, FixedContext};
pub use scope::{active_frames, enter, scope, ScopedContext, TraversalGuard};
pub use types::{CallerRole, SubsystemId};
