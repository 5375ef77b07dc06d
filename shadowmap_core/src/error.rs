//! Error types for ShadowMap collections.

use thiserror::Error;

/// Errors that can occur while building a shadow view.
///
/// Membership operations never fail; only taking the independent copy can.
#[derive(Debug, Error)]
pub enum ShadowError {
    /// The source collection could not produce an independent, consistent copy.
    #[error("Clone failure: {0}")]
    CloneFailure(String),
}

impl ShadowError {
    /// Creates a clone failure.
    pub fn clone_failure(msg: impl Into<String>) -> Self {
        Self::CloneFailure(msg.into())
    }
}
