//! Warrant Types - Canonical domain types for hierarchical agent delegation
//!
//! This crate contains all foundational types for Warrant with zero dependencies
//! on other warrant crates. It defines:
//!
//! - Identity types (Address, Selector, GrantId)
//! - Agent classification and capability bitsets
//! - The error type shared by every component
//! - Notification events and the sink they are published through
//! - Clocks and configuration
//!
//! # Delegation Flow
//!
//! ```text
//! User → binds → Master → grants → Child → executes through → Authority → Target
//! ```
//!
//! # Architectural Invariants
//!
//! 1. Identities are registered at most once and never removed
//! 2. Grant ids are sequential, start at 1, and are never reused
//! 3. Validity is derived (active AND exists AND not expired), never stored
//! 4. Every operation is atomic: it commits all of its effects or none

pub mod identity;
pub mod agent;
pub mod error;
pub mod event;
pub mod clock;
pub mod config;

pub use identity::*;
pub use agent::*;
pub use error::*;
pub use event::*;
pub use clock::*;
pub use config::*;

/// Version of the Warrant types schema
pub const TYPES_VERSION: &str = "0.1.0";
