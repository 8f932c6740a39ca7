//! Notifications emitted on every state transition
//!
//! Each event carries everything needed to reconstruct the transition
//! without re-querying current state. Events are published after the
//! transition commits, inside the same operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::{Address, AgentKind, Capabilities, GrantId, Selector};

/// Delegation events consumed by indexing and observability layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DelegationEvent {
    /// A master or child identity was registered
    AgentRegistered {
        identity: Address,
        kind: AgentKind,
        capabilities: Capabilities,
        metadata: String,
        registrar: Address,
        timestamp: DateTime<Utc>,
    },

    /// An identity was soft-deleted
    AgentDeactivated {
        identity: Address,
        kind: AgentKind,
        by: Address,
        timestamp: DateTime<Utc>,
    },

    /// An identity's capability bitset was replaced
    CapabilitiesUpdated {
        identity: Address,
        old: Capabilities,
        new: Capabilities,
        by: Address,
        timestamp: DateTime<Utc>,
    },

    /// A user bound a master
    MasterBound {
        owner: Address,
        master: Address,
        timestamp: DateTime<Utc>,
    },

    /// A user tore down their binding and every grant under it
    MasterRevoked {
        owner: Address,
        master: Address,
        grants_revoked: usize,
        timestamp: DateTime<Utc>,
    },

    /// A master delegated a scoped permission to a child
    GrantCreated {
        grant_id: GrantId,
        master: Address,
        child: Address,
        target: Address,
        selectors: Vec<Selector>,
        max_value: u64,
        expiry: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// A single grant was revoked
    GrantRevoked {
        grant_id: GrantId,
        master: Address,
        child: Address,
        by: Address,
        timestamp: DateTime<Utc>,
    },

    /// Every still-active grant of a master was revoked
    AllGrantsRevoked {
        master: Address,
        by: Address,
        count: usize,
        revoked: Vec<GrantId>,
        timestamp: DateTime<Utc>,
    },

    /// A child executed a call through a grant
    ExecutedThrough {
        grant_id: GrantId,
        child: Address,
        target: Address,
        selector: Selector,
        value: u64,
        timestamp: DateTime<Utc>,
    },

    /// A batch revoke finished; `ids` is the full input, skipped ids included
    BatchRevoked {
        by: Address,
        succeeded: usize,
        ids: Vec<GrantId>,
        timestamp: DateTime<Utc>,
    },
}

impl DelegationEvent {
    /// Short name of the event variant
    pub fn name(&self) -> &'static str {
        match self {
            Self::AgentRegistered { .. } => "AgentRegistered",
            Self::AgentDeactivated { .. } => "AgentDeactivated",
            Self::CapabilitiesUpdated { .. } => "CapabilitiesUpdated",
            Self::MasterBound { .. } => "MasterBound",
            Self::MasterRevoked { .. } => "MasterRevoked",
            Self::GrantCreated { .. } => "GrantCreated",
            Self::GrantRevoked { .. } => "GrantRevoked",
            Self::AllGrantsRevoked { .. } => "AllGrantsRevoked",
            Self::ExecutedThrough { .. } => "ExecutedThrough",
            Self::BatchRevoked { .. } => "BatchRevoked",
        }
    }

    /// When the transition happened
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::AgentRegistered { timestamp, .. }
            | Self::AgentDeactivated { timestamp, .. }
            | Self::CapabilitiesUpdated { timestamp, .. }
            | Self::MasterBound { timestamp, .. }
            | Self::MasterRevoked { timestamp, .. }
            | Self::GrantCreated { timestamp, .. }
            | Self::GrantRevoked { timestamp, .. }
            | Self::AllGrantsRevoked { timestamp, .. }
            | Self::ExecutedThrough { timestamp, .. }
            | Self::BatchRevoked { timestamp, .. } => *timestamp,
        }
    }

    /// Whether the address takes part in this event in any role
    pub fn involves(&self, address: &Address) -> bool {
        match self {
            Self::AgentRegistered {
                identity, registrar, ..
            } => identity == address || registrar == address,
            Self::AgentDeactivated { identity, by, .. }
            | Self::CapabilitiesUpdated { identity, by, .. } => {
                identity == address || by == address
            }
            Self::MasterBound { owner, master, .. } | Self::MasterRevoked { owner, master, .. } => {
                owner == address || master == address
            }
            Self::GrantCreated {
                master,
                child,
                target,
                ..
            } => master == address || child == address || target == address,
            Self::GrantRevoked {
                master, child, by, ..
            } => master == address || child == address || by == address,
            Self::AllGrantsRevoked { master, by, .. } => master == address || by == address,
            Self::ExecutedThrough { child, target, .. } => child == address || target == address,
            Self::BatchRevoked { by, .. } => by == address,
        }
    }
}

/// Receiver of delegation events
pub trait EventSink: Send + Sync {
    /// Publish one event. Must not fail or block the caller.
    fn emit(&self, event: DelegationEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: DelegationEvent) {
        (**self).emit(event)
    }
}

/// Sink that discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DelegationEvent) {}
}

/// Sink that retains every event in memory
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<DelegationEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events received so far
    pub fn events(&self) -> Vec<DelegationEvent> {
        self.events.lock().clone()
    }

    /// Names of all events received so far, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(DelegationEvent::name).collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: DelegationEvent) {
        self.events.lock().push(event);
    }
}
