//! Error types for the simulation harness.

use shadowmap_core::ShadowError;
use thiserror::Error;

/// Errors that can end a scenario run.
#[derive(Debug, Error)]
pub enum SimError {
    /// The shadow view could not be created
    #[error("Shadow error: {0}")]
    Shadow(#[from] ShadowError),
    
    /// An isolation invariant did not hold
    #[error("Invariant violated: {0}")]
    Invariant(String),
    
    /// Runtime, thread, or file failure
    #[error("Runtime error: {0}")]
    Runtime(String),
    
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SimError {
    /// Creates an invariant violation.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }
    
    /// Creates a runtime error.
    pub fn runtime(msg: impl std::fmt::Display) -> Self {
        Self::Runtime(msg.to_string())
    }
}
