//! The agent directory
//!
//! All tables live behind a single lock. Every mutating operation holds the
//! write lock for its whole validate-then-mutate span, so no reader ever sees
//! a partially applied change.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};
use warrant_types::{
    Address, AgentKind, Capabilities, Clock, DelegationEvent, EventSink, NullSink, Result,
    SystemClock, WarrantError,
};

use crate::AgentIdentity;

/// Directory tables
///
/// Query methods are pure and never fail: unknown identifiers yield empty or
/// default results.
#[derive(Debug, Default)]
pub struct DirectoryState {
    agents: HashMap<Address, AgentIdentity>,
    /// Every registered identifier, in registration order
    registered: Vec<Address>,
    /// Master → children, in registration order
    children: HashMap<Address, Vec<Address>>,
    /// Child → parent master
    parents: HashMap<Address, Address>,
}

impl DirectoryState {
    pub fn identity(&self, address: &Address) -> Option<&AgentIdentity> {
        self.agents.get(address)
    }

    /// Kind of the identity, `AgentKind::None` when unknown
    pub fn kind_of(&self, address: &Address) -> AgentKind {
        self.agents
            .get(address)
            .map(|a| a.kind)
            .unwrap_or_default()
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.agents.contains_key(address)
    }

    /// Registered and active
    pub fn is_active(&self, address: &Address) -> bool {
        self.agents.get(address).is_some_and(|a| a.active)
    }

    /// Bitwise AND of the identity's capabilities with `mask` is non-zero
    pub fn has_capability(&self, address: &Address, mask: Capabilities) -> bool {
        self.agents
            .get(address)
            .is_some_and(|a| a.capabilities.contains_any(mask))
    }

    pub fn parent_of(&self, child: &Address) -> Option<Address> {
        self.parents.get(child).copied()
    }

    pub fn children_of(&self, master: &Address) -> &[Address] {
        self.children.get(master).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn identities(&self) -> &[Address] {
        &self.registered
    }

    pub fn identity_count(&self) -> usize {
        self.registered.len()
    }

    fn insert(&mut self, identity: AgentIdentity) {
        self.registered.push(identity.address);
        self.agents.insert(identity.address, identity);
    }

    /// Masters answer to their registrar. Children answer to their parent
    /// and, for deactivation only, to the parent's registrar.
    fn authorize(&self, caller: &Address, subject: &AgentIdentity, allow_grandparent: bool) -> Result<()> {
        let allowed = match subject.kind {
            AgentKind::Master => *caller == subject.registrar,
            AgentKind::Child => {
                let parent = self.parent_of(&subject.address).unwrap_or(subject.registrar);
                *caller == parent
                    || (allow_grandparent
                        && self
                            .agents
                            .get(&parent)
                            .is_some_and(|p| p.registrar == *caller))
            }
            AgentKind::None => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(WarrantError::Unauthorized {
                caller: *caller,
                subject: subject.address,
            })
        }
    }
}

/// Registry of master and child agents
#[derive(Clone)]
pub struct AgentDirectory {
    state: Arc<RwLock<DirectoryState>>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl AgentDirectory {
    /// Create an empty directory on the wall clock that discards events
    pub fn new() -> Self {
        Self::with_components(Arc::new(SystemClock), Arc::new(NullSink))
    }

    pub fn with_components(clock: Arc<dyn Clock>, events: Arc<dyn EventSink>) -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState::default())),
            clock,
            events,
        }
    }

    /// Hold a consistent read view across several queries
    pub async fn read(&self) -> RwLockReadGuard<'_, DirectoryState> {
        self.state.read().await
    }

    /// Register a master identity on behalf of `registrar`
    pub async fn register_master(
        &self,
        registrar: Address,
        identity: Address,
        capabilities: Capabilities,
        metadata: impl Into<String>,
    ) -> Result<AgentIdentity> {
        if identity.is_zero() {
            return Err(WarrantError::InvalidIdentity { identity });
        }

        let mut state = self.state.write().await;
        if state.is_registered(&identity) {
            debug!(identity = %identity, "master registration rejected: already registered");
            return Err(WarrantError::AlreadyRegistered { identity });
        }

        let record = AgentIdentity {
            address: identity,
            kind: AgentKind::Master,
            capabilities,
            metadata: metadata.into(),
            active: true,
            registered_at: self.clock.now(),
            registrar,
        };
        state.insert(record.clone());

        info!(identity = %identity, registrar = %registrar, "Master registered");
        self.emit_registered(&record);
        Ok(record)
    }

    /// Register a child identity under the calling master
    pub async fn register_child(
        &self,
        caller: Address,
        identity: Address,
        capabilities: Capabilities,
        metadata: impl Into<String>,
    ) -> Result<AgentIdentity> {
        if identity.is_zero() {
            return Err(WarrantError::InvalidIdentity { identity });
        }

        let mut state = self.state.write().await;
        if state.is_registered(&identity) {
            debug!(identity = %identity, "child registration rejected: already registered");
            return Err(WarrantError::AlreadyRegistered { identity });
        }
        // Kind alone gates this call; an inactive master may still register
        let parent_kind = match state.identity(&caller) {
            Some(parent) => parent.kind,
            None => return Err(WarrantError::MasterNotRegistered { caller }),
        };
        if !parent_kind.is_master() {
            return Err(WarrantError::NotMaster {
                identity: caller,
                owner: Address::ZERO,
            });
        }

        let record = AgentIdentity {
            address: identity,
            kind: AgentKind::Child,
            capabilities,
            metadata: metadata.into(),
            active: true,
            registered_at: self.clock.now(),
            registrar: caller,
        };
        state.insert(record.clone());
        state.parents.insert(identity, caller);
        state.children.entry(caller).or_default().push(identity);

        info!(identity = %identity, parent = %caller, "Child registered");
        self.emit_registered(&record);
        Ok(record)
    }

    /// Soft-delete one identity
    pub async fn deactivate(&self, caller: Address, identity: Address) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .identity(&identity)
            .ok_or(WarrantError::NotRegistered { identity })?;
        if !record.active {
            return Err(WarrantError::AlreadyDeactivated { identity });
        }
        state.authorize(&caller, record, true)?;

        let kind = record.kind;
        if let Some(record) = state.agents.get_mut(&identity) {
            record.active = false;
        }

        info!(identity = %identity, kind = %kind, by = %caller, "Agent deactivated");
        self.events.emit(DelegationEvent::AgentDeactivated {
            identity,
            kind,
            by: caller,
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    /// Soft-delete every still-active child of `master`.
    ///
    /// Already inactive children are skipped. The master itself is untouched.
    pub async fn deactivate_all_children(&self, caller: Address, master: Address) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .identity(&master)
            .ok_or(WarrantError::NotRegistered { identity: master })?;
        if !record.is_master() {
            return Err(WarrantError::NotMaster {
                identity: master,
                owner: Address::ZERO,
            });
        }
        if caller != master && caller != record.registrar {
            return Err(WarrantError::Unauthorized {
                caller,
                subject: master,
            });
        }

        let children = state.children_of(&master).to_vec();
        let now = self.clock.now();
        let mut deactivated = 0usize;
        for child in children {
            let Some(record) = state.agents.get_mut(&child) else {
                continue;
            };
            if !record.active {
                debug!(child = %child, "child already inactive, skipping");
                continue;
            }
            record.active = false;
            deactivated += 1;
            self.events.emit(DelegationEvent::AgentDeactivated {
                identity: child,
                kind: AgentKind::Child,
                by: caller,
                timestamp: now,
            });
        }

        info!(master = %master, by = %caller, deactivated, "Children deactivated");
        Ok(())
    }

    /// Replace an active identity's capability bitset
    pub async fn update_capabilities(
        &self,
        caller: Address,
        identity: Address,
        capabilities: Capabilities,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .identity(&identity)
            .ok_or(WarrantError::NotRegistered { identity })?;
        if !record.active {
            return Err(WarrantError::IdentityInactive { identity });
        }
        state.authorize(&caller, record, false)?;

        let old = record.capabilities;
        if let Some(record) = state.agents.get_mut(&identity) {
            record.capabilities = capabilities;
        }

        info!(identity = %identity, old = %old, new = %capabilities, "Capabilities updated");
        self.events.emit(DelegationEvent::CapabilitiesUpdated {
            identity,
            old,
            new: capabilities,
            by: caller,
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    pub async fn identity(&self, address: &Address) -> Option<AgentIdentity> {
        self.read().await.identity(address).cloned()
    }

    pub async fn kind_of(&self, address: &Address) -> AgentKind {
        self.read().await.kind_of(address)
    }

    pub async fn has_capability(&self, address: &Address, mask: Capabilities) -> bool {
        self.read().await.has_capability(address, mask)
    }

    pub async fn identities(&self) -> Vec<Address> {
        self.read().await.identities().to_vec()
    }

    pub async fn identity_count(&self) -> usize {
        self.read().await.identity_count()
    }

    pub async fn children_of(&self, master: &Address) -> Vec<Address> {
        self.read().await.children_of(master).to_vec()
    }

    /// Children of `master` that are still active, in registration order
    pub async fn active_children_of(&self, master: &Address) -> Vec<Address> {
        let state = self.read().await;
        state
            .children_of(master)
            .iter()
            .filter(|c| state.is_active(c))
            .copied()
            .collect()
    }

    pub async fn parent_of(&self, child: &Address) -> Option<Address> {
        self.read().await.parent_of(child)
    }

    pub async fn is_active(&self, address: &Address) -> bool {
        self.read().await.is_active(address)
    }

    pub async fn is_registered(&self, address: &Address) -> bool {
        self.read().await.is_registered(address)
    }

    fn emit_registered(&self, record: &AgentIdentity) {
        self.events.emit(DelegationEvent::AgentRegistered {
            identity: record.address,
            kind: record.kind,
            capabilities: record.capabilities,
            metadata: record.metadata.clone(),
            registrar: record.registrar,
            timestamp: record.registered_at,
        });
    }
}

impl Default for AgentDirectory {
    fn default() -> Self {
        Self::new()
    }
}
