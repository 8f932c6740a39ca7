//! Warrant Audit - Observability for delegation events
//!
//! Every state transition in the directory, authority and batch facade is
//! published as a `DelegationEvent`. This crate records them:
//!
//! - [`AuditJournal`]: append-only log where each entry commits to the hash
//!   of the one before it, so any rewrite is detectable
//! - [`EventBus`]: broadcast fan-out to live subscribers
//! - [`Fanout`]: one sink feeding several

pub mod journal;
pub mod bus;

pub use journal::*;
pub use bus::*;
