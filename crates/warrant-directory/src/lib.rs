//! Warrant Directory - Registry of master and child agents
//!
//! The directory is the leaf component of Warrant. It supports:
//! - One-time registration of masters and children
//! - Parent→children and child→parent links
//! - Soft deactivation, individually or for every child of a master
//! - Capability bitsets per identity
//!
//! # Invariants
//!
//! 1. An identifier is registered at most once, ever
//! 2. Kind and registrar are immutable after registration
//! 3. Only masters register children; a child's registrar is its parent
//! 4. Identities are never removed, only deactivated

pub mod identity;
pub mod directory;

pub use identity::*;
pub use directory::*;
