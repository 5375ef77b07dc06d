//! ShadowMap Core - Isolating a background traversal from a live collection
//!
//! This library solves one problem: a long-running background traversal
//! (a saver walking entities to persist them) must iterate a grouped
//! collection that a live loop keeps mutating, without:
//! 1. **Concurrent modification**: the walk never iterates the live container
//! 2. **Lost entries**: the walk's bookkeeping never edits the live container
//! 3. **Stale writes**: live edits made through the view land in both copies
//!
//! # Pieces
//!
//! - [`GroupedCollection`]: set of elements plus a group-key index
//! - [`Authoritative`]: shared handle to the live collection
//! - [`ShadowView`]: shadow copy + two-tier mutation + caller-sensitive reads
//! - [`Membership`]: the capability interface both handles implement

pub mod authoritative;
pub mod divergence;
pub mod error;
pub mod grouped;
pub mod membership;
pub mod shadow;

// Re-export key types for convenience
pub use authoritative::Authoritative;
pub use divergence::Divergence;
pub use error::ShadowError;
pub use grouped::{ExportState, GroupState, Grouped, GroupedCollection};
pub use membership::Membership;
pub use shadow::ShadowView;
