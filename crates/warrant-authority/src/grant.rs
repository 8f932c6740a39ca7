//! Permission grants and master bindings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use warrant_types::{Address, GrantId, Selector};

/// A scoped capability delegated from a master to a child
///
/// Validity is derived: a grant is valid while it is active and `now` is
/// before `expiry`. Once inactive it stays inactive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Sequential id, never zero
    pub id: GrantId,
    /// Granting master
    pub master: Address,
    /// Receiving child
    pub child: Address,
    /// Endpoint calls are forwarded to
    pub target: Address,
    /// Allowed action selectors, in insertion order
    pub selectors: Vec<Selector>,
    /// Maximum value per invocation
    pub max_value: u64,
    /// Absolute expiry
    pub expiry: DateTime<Utc>,
    /// Cleared on revocation
    pub active: bool,
    /// When granted
    pub created_at: DateTime<Utc>,
}

impl PermissionGrant {
    /// Expired once `now` reaches `expiry`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.id.is_none() && self.active && !self.is_expired_at(now)
    }

    /// Linear scan of the allow-list
    pub fn allows(&self, selector: &Selector) -> bool {
        self.selectors.iter().any(|s| s == selector)
    }
}

/// A user's choice of master agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterBinding {
    pub master: Address,
    pub owner: Address,
    pub created_at: DateTime<Utc>,
    /// Cleared by a full master revoke
    pub active: bool,
    /// Grants issued under this binding, in issue order
    pub grants: Vec<GrantId>,
}

/// Parameters of a new grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRequest {
    pub child: Address,
    pub target: Address,
    pub selectors: Vec<Selector>,
    pub max_value: u64,
    pub expiry: DateTime<Utc>,
}

impl GrantRequest {
    /// Start a request with no selectors and a zero value ceiling
    pub fn new(child: Address, target: Address, expiry: DateTime<Utc>) -> Self {
        Self {
            child,
            target,
            selectors: vec![],
            max_value: 0,
            expiry,
        }
    }

    /// Add one allowed selector
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    /// Replace the allowed selectors
    pub fn with_selectors(mut self, selectors: impl IntoIterator<Item = Selector>) -> Self {
        self.selectors = selectors.into_iter().collect();
        self
    }

    /// Set the per-invocation value ceiling
    pub fn with_max_value(mut self, max_value: u64) -> Self {
        self.max_value = max_value;
        self
    }
}
