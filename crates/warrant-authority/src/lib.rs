//! Warrant Authority - Scoped grants and cascading revocation
//!
//! The authority sits on top of the agent directory and owns:
//! - The user→master binding (one active master per user, one owner per master)
//! - The grant ledger, indexed by child and by master
//! - Single, per-master, and full-binding revocation
//! - Mediated execution: children call targets only through a grant
//!
//! # Grant lifecycle
//!
//! ```text
//! nonexistent ──grant──▶ active ──revoke / cascade──▶ inactive (terminal)
//!                          │
//!                          └── now >= expiry: expired (derived, no write)
//! ```

pub mod grant;
pub mod router;
pub mod authority;

pub use grant::*;
pub use router::*;
pub use authority::PermissionAuthority;
