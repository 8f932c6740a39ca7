//! Walkthrough commands
//!
//! Each command builds a fresh in-process deployment and drives it through
//! the public operations only.

pub mod batch;
pub mod cascade;
pub mod scenario;

use std::sync::Arc;

use async_trait::async_trait;
use warrant_audit::AuditJournal;
use warrant_authority::{CallContext, CallTarget, PermissionAuthority, TargetRouter};
use warrant_batch::BatchRevoker;
use warrant_directory::AgentDirectory;
use warrant_types::{Address, ManualClock, WarrantConfig};

/// Target that returns the payload it was sent
pub struct EchoTarget;

#[async_trait]
impl CallTarget for EchoTarget {
    async fn call(&self, ctx: CallContext) -> Result<Vec<u8>, Vec<u8>> {
        Ok(ctx.payload)
    }
}

/// A directory, authority and batch facade sharing one clock and journal
pub struct Deployment {
    pub clock: ManualClock,
    pub journal: AuditJournal,
    pub directory: AgentDirectory,
    pub authority: PermissionAuthority,
    pub batch: BatchRevoker,
}

impl Deployment {
    /// Wire every component; an [`EchoTarget`] answers at `echo_at`
    pub fn new(config: &WarrantConfig, echo_at: Address) -> Self {
        let clock = ManualClock::starting_now();
        let journal = AuditJournal::from_config(config);
        let events = Arc::new(journal.clone());

        let directory = AgentDirectory::with_components(Arc::new(clock.clone()), events.clone());
        let router = TargetRouter::new();
        router.register(echo_at, Arc::new(EchoTarget));
        let authority = PermissionAuthority::new(Address::from_label("warrant.authority"), directory.clone())
            .with_router(router)
            .with_clock(Arc::new(clock.clone()))
            .with_events(events.clone())
            .with_config(config.clone());
        let batch = BatchRevoker::new(authority.clone()).with_events(events);

        Self {
            clock,
            journal,
            directory,
            authority,
            batch,
        }
    }
}
