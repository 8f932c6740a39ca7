//! Error types for Warrant
//!
//! Every failure is typed and carries the values a caller needs to diagnose
//! it. A failing operation leaves no side effects behind.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{Address, AgentKind, GrantId, Selector};

/// Result type for Warrant operations
pub type Result<T> = std::result::Result<T, WarrantError>;

/// Warrant error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WarrantError {
    // ========================================================================
    // Directory Errors
    // ========================================================================

    /// Identifier has been registered before (possibly deactivated since)
    #[error("Identity {identity} is already registered")]
    AlreadyRegistered { identity: Address },

    /// Identifier is the null sentinel
    #[error("Identity {identity} is not a valid identity")]
    InvalidIdentity { identity: Address },

    /// Caller registering a child is not itself registered
    #[error("Caller {caller} is not a registered master")]
    MasterNotRegistered { caller: Address },

    /// Identity is unknown to the directory
    #[error("Identity {identity} is not registered")]
    NotRegistered { identity: Address },

    /// Identity cannot act as a master.
    ///
    /// `owner` is [`Address::ZERO`] when the identity has no bound owner,
    /// which is also how an unbound master is reported at grant time.
    #[error("Identity {identity} is not an active master (owner {owner})")]
    NotMaster { identity: Address, owner: Address },

    /// Identity was already soft-deleted
    #[error("Identity {identity} is already deactivated")]
    AlreadyDeactivated { identity: Address },

    /// Identity exists but is no longer active
    #[error("Identity {identity} is inactive")]
    IdentityInactive { identity: Address },

    /// Caller is not allowed to act on the subject
    #[error("Caller {caller} is not authorized to act on {subject}")]
    Unauthorized { caller: Address, subject: Address },

    // ========================================================================
    // Binding Errors
    // ========================================================================

    /// Owner already holds an active binding
    #[error("Owner {owner} is already bound to master {master}")]
    AlreadyBound { owner: Address, master: Address },

    /// Owner holds no active binding
    #[error("Owner {owner} has no bound master")]
    NotBound { owner: Address },

    // ========================================================================
    // Grant Errors
    // ========================================================================

    /// Child is not an active child of the granting master.
    ///
    /// Covers both the wrong kind and the wrong parent.
    #[error("Identity {child} is not an active child of {master} (kind {kind}, parent {parent})")]
    NotChild {
        child: Address,
        master: Address,
        kind: AgentKind,
        parent: Address,
    },

    /// Target endpoint is the null address
    #[error("Target endpoint must not be the null address")]
    InvalidTarget,

    /// Selector allow-list is empty
    #[error("A grant needs at least one selector")]
    NoSelectors,

    /// Selector allow-list exceeds the configured bound
    #[error("Grant lists {count} selectors, maximum is {max}")]
    TooManySelectors { count: usize, max: usize },

    /// Grant expired, or the requested expiry is not in the future.
    ///
    /// `grant_id` is [`GrantId::NONE`] when the grant was never created.
    #[error("{grant_id} expiry {expiry} is not after {now}")]
    Expired {
        grant_id: GrantId,
        expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// Grant id was never issued
    #[error("{grant_id} not found")]
    NotFound { grant_id: GrantId },

    /// Grant has been revoked
    #[error("{grant_id} is not active")]
    NotActive { grant_id: GrantId },

    // ========================================================================
    // Execution Errors
    // ========================================================================

    /// Caller is not the grant's child
    #[error("{grant_id} belongs to {expected}, caller was {caller}")]
    WrongCaller {
        grant_id: GrantId,
        expected: Address,
        caller: Address,
    },

    /// Payload too short to hold a selector
    #[error("Payload of {len} bytes does not contain a selector")]
    MalformedPayload { len: usize },

    /// Selector is not on the grant's allow-list
    #[error("{grant_id} does not allow selector {selector}")]
    SelectorNotAllowed { grant_id: GrantId, selector: Selector },

    /// Attached value exceeds the grant's ceiling
    #[error("{grant_id} value {value} exceeds cap {max_value}")]
    ValueExceedsLimit {
        grant_id: GrantId,
        value: u64,
        max_value: u64,
    },

    /// The forwarded call itself failed
    #[error("{grant_id} forwarded call to {target} failed: 0x{}", hex::encode(.reason))]
    CallFailed {
        grant_id: GrantId,
        target: Address,
        reason: Vec<u8>,
    },

    /// Nothing is reachable at the target address
    #[error("No endpoint is reachable at {target}")]
    NoRoute { target: Address },

    /// A forwarded call tried to change authority state mid-forward
    #[error("Authority {authority} cannot be modified from inside a forwarded call")]
    Reentrant { authority: Address },

    // ========================================================================
    // Batch Errors
    // ========================================================================

    /// Batch contained no ids
    #[error("Batch revoke needs at least one id")]
    EmptyBatch,

    /// Batch exceeds the configured bound
    #[error("Batch of {len} ids exceeds maximum {max}")]
    BatchTooLarge { len: usize, max: usize },

    // ========================================================================
    // General Errors
    // ========================================================================

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

impl WarrantError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error stems from an authorization rule rather than
    /// from the state of the subject
    pub fn is_authorization_failure(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized { .. } | Self::WrongCaller { .. } | Self::MasterNotRegistered { .. }
        )
    }

    /// Get a stable error code for callers and indexers
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyRegistered { .. } => "ALREADY_REGISTERED",
            Self::InvalidIdentity { .. } => "INVALID_IDENTITY",
            Self::MasterNotRegistered { .. } => "MASTER_NOT_REGISTERED",
            Self::NotRegistered { .. } => "NOT_REGISTERED",
            Self::NotMaster { .. } => "NOT_MASTER",
            Self::AlreadyDeactivated { .. } => "ALREADY_DEACTIVATED",
            Self::IdentityInactive { .. } => "IDENTITY_INACTIVE",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::AlreadyBound { .. } => "ALREADY_BOUND",
            Self::NotBound { .. } => "NOT_BOUND",
            Self::NotChild { .. } => "NOT_CHILD",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::NoSelectors => "NO_SELECTORS",
            Self::TooManySelectors { .. } => "TOO_MANY_SELECTORS",
            Self::Expired { .. } => "EXPIRED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::NotActive { .. } => "NOT_ACTIVE",
            Self::WrongCaller { .. } => "WRONG_CALLER",
            Self::MalformedPayload { .. } => "MALFORMED_PAYLOAD",
            Self::SelectorNotAllowed { .. } => "SELECTOR_NOT_ALLOWED",
            Self::ValueExceedsLimit { .. } => "VALUE_EXCEEDS_LIMIT",
            Self::CallFailed { .. } => "CALL_FAILED",
            Self::NoRoute { .. } => "NO_ROUTE",
            Self::Reentrant { .. } => "REENTRANT",
            Self::EmptyBatch => "EMPTY_BATCH",
            Self::BatchTooLarge { .. } => "BATCH_TOO_LARGE",
            Self::Config { .. } => "CONFIG",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = WarrantError::ValueExceedsLimit {
            grant_id: GrantId(3),
            value: 10,
            max_value: 5,
        };
        assert_eq!(err.error_code(), "VALUE_EXCEEDS_LIMIT");
        assert_eq!(err.to_string(), "grant#3 value 10 exceeds cap 5");
    }

    #[test]
    fn test_authorization_failures() {
        let unauthorized = WarrantError::Unauthorized {
            caller: Address::from_label("mallory"),
            subject: Address::from_label("alice"),
        };
        assert!(unauthorized.is_authorization_failure());
        assert!(!WarrantError::EmptyBatch.is_authorization_failure());
    }

    #[test]
    fn test_call_failed_renders_reason_as_hex() {
        let err = WarrantError::CallFailed {
            grant_id: GrantId(1),
            target: Address::ZERO,
            reason: vec![0xde, 0xad],
        };
        assert!(err.to_string().ends_with("failed: 0xdead"));
    }
}
