//! The permission authority
//!
//! Owns the user→master bindings, the grant ledger with its by-child and
//! by-master indexes, and every revocation path.
//!
//! State-changing operations run one at a time: each holds the operation
//! lock for its whole span, including the forwarded call of
//! `execute_through`, so a revoke can never land in the middle of a mediated
//! call. Lock order is operation lock, then directory read guard, then the
//! authority tables. Queries take only a short read of the tables and stay
//! available to targets during a forward; a target that tries to change
//! authority state from inside the forward gets [`WarrantError::Reentrant`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};
use warrant_directory::AgentDirectory;
use warrant_types::{
    Address, Clock, DelegationEvent, EventSink, GrantId, NullSink, Result, Selector, SystemClock,
    WarrantConfig, WarrantError,
};

use crate::{CallContext, GrantRequest, MasterBinding, PermissionGrant, TargetRouter};

tokio::task_local! {
    /// Address of the authority whose forwarded call is running on this task
    static FORWARDING: Address;
}

/// Authority tables
#[derive(Debug, Default)]
struct AuthorityState {
    /// Grant arena; the grant with id `n` sits at index `n - 1`
    grants: Vec<PermissionGrant>,
    /// Child → grant ids, in issue order. Never pruned.
    by_child: HashMap<Address, Vec<GrantId>>,
    /// Master → grant ids, in issue order. Never pruned.
    by_master: HashMap<Address, Vec<GrantId>>,
    /// Owner → most recent binding
    bindings: HashMap<Address, MasterBinding>,
    /// Master → owner, present only while the binding is active
    owners: HashMap<Address, Address>,
}

impl AuthorityState {
    fn grant(&self, id: GrantId) -> Option<&PermissionGrant> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.grants.get(index)
    }

    fn grant_mut(&mut self, id: GrantId) -> Option<&mut PermissionGrant> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.grants.get_mut(index)
    }

    fn next_id(&self) -> GrantId {
        self.grants.last().map_or(GrantId::FIRST, |g| g.id.next())
    }

    fn active_binding(&self, owner: &Address) -> Option<&MasterBinding> {
        self.bindings.get(owner).filter(|b| b.active)
    }

    /// Flip every still-active grant of `master`, returning the flipped ids.
    /// Already inactive grants are skipped.
    fn sweep_master(&mut self, master: &Address) -> Vec<GrantId> {
        let ids = self.by_master.get(master).cloned().unwrap_or_default();
        let mut revoked = Vec::new();
        for id in ids {
            if let Some(grant) = self.grant_mut(id) {
                if grant.active {
                    grant.active = false;
                    revoked.push(id);
                } else {
                    debug!(grant_id = %id, "grant already inactive, skipping");
                }
            }
        }
        revoked
    }
}

/// Mediating authority for master→child delegation
///
/// Cheap to clone; clones share state. The directory, router, clock, event
/// sink and config are fixed once the authority is first shared.
#[derive(Clone)]
pub struct PermissionAuthority {
    address: Address,
    directory: AgentDirectory,
    router: TargetRouter,
    state: Arc<RwLock<AuthorityState>>,
    /// Serializes state-changing operations
    ops: Arc<Mutex<()>>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    config: WarrantConfig,
}

impl PermissionAuthority {
    /// Create an authority over `directory` on the wall clock that discards
    /// events and routes to nothing
    pub fn new(address: Address, directory: AgentDirectory) -> Self {
        Self {
            address,
            directory,
            router: TargetRouter::new(),
            state: Arc::new(RwLock::new(AuthorityState::default())),
            ops: Arc::new(Mutex::new(())),
            clock: Arc::new(SystemClock),
            events: Arc::new(NullSink),
            config: WarrantConfig::default(),
        }
    }

    pub fn with_router(mut self, router: TargetRouter) -> Self {
        self.router = router;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_config(mut self, config: WarrantConfig) -> Self {
        self.config = config;
        self
    }

    /// The authority's own address, used as the sender of forwarded calls
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn directory(&self) -> &AgentDirectory {
        &self.directory
    }

    pub fn router(&self) -> &TargetRouter {
        &self.router
    }

    pub fn config(&self) -> &WarrantConfig {
        &self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Wait for exclusive use of the authority's state-changing path
    async fn begin_operation(&self) -> Result<MutexGuard<'_, ()>> {
        let forwarding = FORWARDING
            .try_with(|authority| *authority == self.address)
            .unwrap_or(false);
        if forwarding {
            debug!(authority = %self.address, "state change rejected inside forwarded call");
            return Err(WarrantError::Reentrant {
                authority: self.address,
            });
        }
        Ok(self.ops.lock().await)
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Bind `master` as the calling owner's master
    pub async fn bind_master(&self, owner: Address, master: Address) -> Result<()> {
        let _op = self.begin_operation().await?;
        let directory = self.directory.read().await;
        let mut state = self.state.write().await;

        if let Some(existing) = state.active_binding(&owner) {
            return Err(WarrantError::AlreadyBound {
                owner,
                master: existing.master,
            });
        }

        let identity = directory
            .identity(&master)
            .ok_or(WarrantError::NotRegistered { identity: master })?;
        // Wrong kind and inactive entry are reported alike
        if !identity.is_active_master() {
            return Err(WarrantError::NotMaster {
                identity: master,
                owner: Address::ZERO,
            });
        }
        if let Some(current) = state.owners.get(&master) {
            return Err(WarrantError::AlreadyBound {
                owner: *current,
                master,
            });
        }

        let now = self.clock.now();
        state.bindings.insert(
            owner,
            MasterBinding {
                master,
                owner,
                created_at: now,
                active: true,
                grants: vec![],
            },
        );
        state.owners.insert(master, owner);

        info!(owner = %owner, master = %master, "Master bound");
        self.events.emit(DelegationEvent::MasterBound {
            owner,
            master,
            timestamp: now,
        });
        Ok(())
    }

    /// Tear down the calling owner's binding and every grant under its master.
    ///
    /// Returns the number of grants revoked. The binding is deactivated and
    /// the master→owner mapping cleared even when no grant was active.
    pub async fn revoke_master(&self, owner: Address) -> Result<usize> {
        let _op = self.begin_operation().await?;
        let mut state = self.state.write().await;

        let master = state
            .active_binding(&owner)
            .map(|b| b.master)
            .ok_or(WarrantError::NotBound { owner })?;

        let revoked = state.sweep_master(&master);
        if let Some(binding) = state.bindings.get_mut(&owner) {
            binding.active = false;
        }
        state.owners.remove(&master);

        let count = revoked.len();
        let now = self.clock.now();
        info!(owner = %owner, master = %master, count, "Master revoked");
        self.events.emit(DelegationEvent::AllGrantsRevoked {
            master,
            by: owner,
            count,
            revoked,
            timestamp: now,
        });
        self.events.emit(DelegationEvent::MasterRevoked {
            owner,
            master,
            grants_revoked: count,
            timestamp: now,
        });
        Ok(count)
    }

    // ========================================================================
    // Grants
    // ========================================================================

    /// Delegate a scoped permission from the calling master to one of its
    /// children. Returns the new grant id.
    pub async fn grant(&self, master: Address, request: GrantRequest) -> Result<GrantId> {
        let _op = self.begin_operation().await?;
        let directory = self.directory.read().await;
        let mut state = self.state.write().await;

        let identity = directory
            .identity(&master)
            .ok_or(WarrantError::NotRegistered { identity: master })?;
        if !identity.is_active_master() {
            return Err(WarrantError::NotMaster {
                identity: master,
                owner: Address::ZERO,
            });
        }
        let owner = state.owners.get(&master).copied().ok_or(WarrantError::NotMaster {
            identity: master,
            owner: Address::ZERO,
        })?;

        let child = request.child;
        let child_identity = directory
            .identity(&child)
            .ok_or(WarrantError::NotRegistered { identity: child })?;
        let parent = directory.parent_of(&child).unwrap_or(Address::ZERO);
        if !child_identity.active || !child_identity.is_child() || parent != master {
            debug!(master = %master, child = %child, "grant rejected: not an active child");
            return Err(WarrantError::NotChild {
                child,
                master,
                kind: child_identity.kind,
                parent,
            });
        }

        if request.target.is_zero() {
            return Err(WarrantError::InvalidTarget);
        }
        if request.selectors.is_empty() {
            return Err(WarrantError::NoSelectors);
        }
        if request.selectors.len() > self.config.max_selectors_per_grant {
            return Err(WarrantError::TooManySelectors {
                count: request.selectors.len(),
                max: self.config.max_selectors_per_grant,
            });
        }
        let now = self.clock.now();
        if request.expiry <= now {
            return Err(WarrantError::Expired {
                grant_id: GrantId::NONE,
                expiry: request.expiry,
                now,
            });
        }

        let id = state.next_id();
        let grant = PermissionGrant {
            id,
            master,
            child,
            target: request.target,
            selectors: request.selectors,
            max_value: request.max_value,
            expiry: request.expiry,
            active: true,
            created_at: now,
        };

        self.events.emit(DelegationEvent::GrantCreated {
            grant_id: id,
            master,
            child,
            target: grant.target,
            selectors: grant.selectors.clone(),
            max_value: grant.max_value,
            expiry: grant.expiry,
            timestamp: now,
        });
        info!(
            grant_id = %id,
            master = %master,
            child = %child,
            target = %grant.target,
            max_value = grant.max_value,
            expiry = %grant.expiry,
            "Grant created"
        );

        state.grants.push(grant);
        state.by_child.entry(child).or_default().push(id);
        state.by_master.entry(master).or_default().push(id);
        if let Some(binding) = state.bindings.get_mut(&owner) {
            binding.grants.push(id);
        }
        Ok(id)
    }

    /// Revoke a single grant. Revoking an inactive grant is an error.
    ///
    /// The caller must be the granting master or that master's current owner.
    pub async fn revoke(&self, caller: Address, id: GrantId) -> Result<()> {
        let _op = self.begin_operation().await?;
        let mut state = self.state.write().await;

        let grant = state.grant(id).ok_or(WarrantError::NotFound { grant_id: id })?;
        if !grant.active {
            return Err(WarrantError::NotActive { grant_id: id });
        }
        let master = grant.master;
        let child = grant.child;
        let owner = state.owners.get(&master).copied();
        if caller != master && Some(caller) != owner {
            return Err(WarrantError::Unauthorized {
                caller,
                subject: master,
            });
        }

        if let Some(grant) = state.grant_mut(id) {
            grant.active = false;
        }

        info!(grant_id = %id, master = %master, by = %caller, "Grant revoked");
        self.events.emit(DelegationEvent::GrantRevoked {
            grant_id: id,
            master,
            child,
            by: caller,
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    /// Revoke every still-active grant ever issued by `master`.
    ///
    /// Already inactive grants are skipped without error. Returns how many
    /// grants were flipped. Cost is linear in the grants ever issued by the
    /// master.
    pub async fn revoke_all_for_master(&self, caller: Address, master: Address) -> Result<usize> {
        let _op = self.begin_operation().await?;
        let mut state = self.state.write().await;

        let owner = state.owners.get(&master).copied().ok_or(WarrantError::NotMaster {
            identity: master,
            owner: Address::ZERO,
        })?;
        if caller != master && caller != owner {
            return Err(WarrantError::Unauthorized {
                caller,
                subject: master,
            });
        }

        let revoked = state.sweep_master(&master);
        let count = revoked.len();

        info!(master = %master, by = %caller, count, "All grants revoked for master");
        self.events.emit(DelegationEvent::AllGrantsRevoked {
            master,
            by: caller,
            count,
            revoked,
            timestamp: self.clock.now(),
        });
        Ok(count)
    }

    // ========================================================================
    // Mediated execution
    // ========================================================================

    /// Forward `payload` with `value` to the grant's target on behalf of the
    /// calling child.
    ///
    /// Returns the target's return data. A failed forwarded call fails this
    /// operation with [`WarrantError::CallFailed`] carrying the target's
    /// failure payload. Revocations issued while the call is in flight wait
    /// until it has finished.
    pub async fn execute_through(
        &self,
        caller: Address,
        id: GrantId,
        payload: Vec<u8>,
        value: u64,
    ) -> Result<Vec<u8>> {
        let _op = self.begin_operation().await?;
        let (target, selector) = {
            let state = self.state.read().await;
            let grant = state.grant(id).ok_or(WarrantError::NotFound { grant_id: id })?;
            if !grant.active {
                return Err(WarrantError::NotActive { grant_id: id });
            }
            let now = self.clock.now();
            if grant.is_expired_at(now) {
                return Err(WarrantError::Expired {
                    grant_id: id,
                    expiry: grant.expiry,
                    now,
                });
            }
            if caller != grant.child {
                return Err(WarrantError::WrongCaller {
                    grant_id: id,
                    expected: grant.child,
                    caller,
                });
            }
            let selector = Selector::from_payload(&payload)
                .ok_or(WarrantError::MalformedPayload { len: payload.len() })?;
            if !grant.allows(&selector) {
                return Err(WarrantError::SelectorNotAllowed {
                    grant_id: id,
                    selector,
                });
            }
            if value > grant.max_value {
                return Err(WarrantError::ValueExceedsLimit {
                    grant_id: id,
                    value,
                    max_value: grant.max_value,
                });
            }
            (grant.target, selector)
        };

        // Tables are released; the target may still query the authority
        let endpoint = self
            .router
            .route(&target)
            .ok_or(WarrantError::NoRoute { target })?;
        let call = endpoint.call(CallContext {
            from: self.address,
            grant_id: id,
            value,
            payload,
        });
        let outcome = FORWARDING.scope(self.address, call).await;

        match outcome {
            Ok(data) => {
                info!(grant_id = %id, child = %caller, target = %target, selector = %selector, value, "Executed through grant");
                self.events.emit(DelegationEvent::ExecutedThrough {
                    grant_id: id,
                    child: caller,
                    target,
                    selector,
                    value,
                    timestamp: self.clock.now(),
                });
                Ok(data)
            }
            Err(reason) => {
                warn!(grant_id = %id, target = %target, selector = %selector, "Forwarded call failed");
                Err(WarrantError::CallFailed {
                    grant_id: id,
                    target,
                    reason,
                })
            }
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Active, issued, and not expired at the current time
    pub async fn is_valid(&self, id: GrantId) -> bool {
        let now = self.clock.now();
        self.state
            .read()
            .await
            .grant(id)
            .is_some_and(|g| g.is_valid_at(now))
    }

    /// Whether any currently valid grant of `child` on `target` allows
    /// `selector`. Overlapping grants combine as a union.
    pub async fn has_permission(&self, child: &Address, target: &Address, selector: &Selector) -> bool {
        let now = self.clock.now();
        let state = self.state.read().await;
        let Some(ids) = state.by_child.get(child) else {
            return false;
        };
        ids.iter()
            .filter_map(|id| state.grant(*id))
            .filter(|g| g.target == *target && g.is_valid_at(now))
            .any(|g| g.allows(selector))
    }

    pub async fn grant_info(&self, id: GrantId) -> Option<PermissionGrant> {
        self.state.read().await.grant(id).cloned()
    }

    /// Every grant id ever issued to `child`, in issue order
    pub async fn grants_of_child(&self, child: &Address) -> Vec<GrantId> {
        self.state
            .read()
            .await
            .by_child
            .get(child)
            .cloned()
            .unwrap_or_default()
    }

    /// Every grant id ever issued by `master`, in issue order
    pub async fn grants_of_master(&self, master: &Address) -> Vec<GrantId> {
        self.state
            .read()
            .await
            .by_master
            .get(master)
            .cloned()
            .unwrap_or_default()
    }

    /// Grants of `child` that are valid right now
    pub async fn active_grants_of_child(&self, child: &Address) -> Vec<PermissionGrant> {
        let now = self.clock.now();
        let state = self.state.read().await;
        state
            .by_child
            .get(child)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.grant(*id))
                    .filter(|g| g.is_valid_at(now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Most recent binding of `owner`, active or not
    pub async fn binding_of(&self, owner: &Address) -> Option<MasterBinding> {
        self.state.read().await.bindings.get(owner).cloned()
    }

    /// Current owner of `master`, if bound
    pub async fn owner_of(&self, master: &Address) -> Option<Address> {
        self.state.read().await.owners.get(master).copied()
    }

    /// Whether `owner` holds an active binding
    pub async fn has_master(&self, owner: &Address) -> bool {
        self.state.read().await.active_binding(owner).is_some()
    }

    /// Number of grants ever issued
    pub async fn grant_count(&self) -> usize {
        self.state.read().await.grants.len()
    }
}

impl std::fmt::Debug for PermissionAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionAuthority")
            .field("address", &self.address)
            .field("router", &self.router)
            .field("config", &self.config)
            .finish()
    }
}
