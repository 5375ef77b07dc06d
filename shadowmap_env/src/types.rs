//! Common types for the ShadowMap caller-context abstraction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a subsystem that may enter a traversal scope.
///
/// Uses UUID v4 for global uniqueness without coordination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubsystemId(pub Uuid);

impl SubsystemId {
    /// Creates a new random SubsystemId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
    
    /// Creates a SubsystemId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
    
    /// Creates a deterministic SubsystemId from a seed (for simulation).
    pub fn from_seed(seed: u64) -> Self {
        let mut bytes = [0u8; 16];
        bytes[0..8].copy_from_slice(&seed.to_le_bytes());
        bytes[8..16].copy_from_slice(&seed.wrapping_mul(0x517cc1b727220a95).to_le_bytes());
        Self(Uuid::from_bytes(bytes))
    }
    
    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SubsystemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show first 8 chars for readability
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Which view a read should observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallerRole {
    /// The background traversal: reads the shadow copy.
    Privileged,
    
    /// Everyone else: reads the authoritative collection.
    Normal,
}

impl CallerRole {
    /// Returns true for [`CallerRole::Privileged`].
    pub fn is_privileged(self) -> bool {
        matches!(self, CallerRole::Privileged)
    }
}

impl std::fmt::Display for CallerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallerRole::Privileged => write!(f, "privileged"),
            CallerRole::Normal => write!(f, "normal"),
        }
    }
}
