//! Registered agent identities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warrant_types::{Address, AgentKind, Capabilities};

/// A registered agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Primary key
    pub address: Address,
    /// Immutable after registration
    pub kind: AgentKind,
    /// Capability bitset
    pub capabilities: Capabilities,
    /// Free-form metadata
    pub metadata: String,
    /// Cleared on soft delete
    pub active: bool,
    /// When registered
    pub registered_at: DateTime<Utc>,
    /// Who registered this identity; the parent master for children
    pub registrar: Address,
}

impl AgentIdentity {
    pub fn is_master(&self) -> bool {
        self.kind.is_master()
    }

    pub fn is_child(&self) -> bool {
        self.kind.is_child()
    }

    /// Registered, active, and a master
    pub fn is_active_master(&self) -> bool {
        self.active && self.is_master()
    }
}
