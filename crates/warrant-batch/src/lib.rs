//! Warrant Batch - Bulk revocation
//!
//! A thin facade over [`PermissionAuthority::revoke`]: every id in a batch
//! is attempted exactly once, each attempt is its own atomic revoke, and a
//! failing id is skipped without undoing earlier successes.

use std::sync::Arc;

use tracing::{debug, info};
use warrant_authority::PermissionAuthority;
use warrant_types::{Address, DelegationEvent, EventSink, GrantId, NullSink, Result, WarrantError};

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub grant_id: GrantId,
    /// `None` when the revoke succeeded
    pub error: Option<WarrantError>,
}

impl ItemOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Per-item report of a batch, for callers that want more than the count
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub items: Vec<ItemOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|i| i.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    /// Ids whose revoke went through, in batch order
    pub fn revoked(&self) -> Vec<GrantId> {
        self.items
            .iter()
            .filter(|i| i.succeeded())
            .map(|i| i.grant_id)
            .collect()
    }
}

/// Bulk revocation over a fixed authority handle
#[derive(Clone)]
pub struct BatchRevoker {
    authority: PermissionAuthority,
    events: Arc<dyn EventSink>,
    max_batch_size: usize,
}

impl BatchRevoker {
    /// Wrap `authority`, taking the batch bound from its config
    pub fn new(authority: PermissionAuthority) -> Self {
        let max_batch_size = authority.config().max_batch_size;
        Self {
            authority,
            events: Arc::new(NullSink),
            max_batch_size,
        }
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn authority(&self) -> &PermissionAuthority {
        &self.authority
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Revoke every id on behalf of `caller`, returning how many succeeded.
    ///
    /// Each id goes through the authority's single-grant revoke with the
    /// same caller, so the usual master-or-owner rule applies per item.
    /// Missing, inactive and unauthorized ids are skipped.
    pub async fn batch_revoke(&self, caller: Address, ids: &[GrantId]) -> Result<usize> {
        let report = self.batch_revoke_detailed(caller, ids).await?;
        Ok(report.succeeded())
    }

    /// Like [`batch_revoke`](Self::batch_revoke) but keeps each item's error
    pub async fn batch_revoke_detailed(&self, caller: Address, ids: &[GrantId]) -> Result<BatchReport> {
        if ids.is_empty() {
            return Err(WarrantError::EmptyBatch);
        }
        if ids.len() > self.max_batch_size {
            return Err(WarrantError::BatchTooLarge {
                len: ids.len(),
                max: self.max_batch_size,
            });
        }

        let mut report = BatchReport {
            items: Vec::with_capacity(ids.len()),
        };
        for id in ids {
            let error = match self.authority.revoke(caller, *id).await {
                Ok(()) => None,
                Err(e) => {
                    debug!(grant_id = %id, code = e.error_code(), "batch item skipped");
                    Some(e)
                }
            };
            report.items.push(ItemOutcome {
                grant_id: *id,
                error,
            });
        }

        let succeeded = report.succeeded();
        info!(by = %caller, succeeded, total = ids.len(), "Batch revoked");
        self.events.emit(DelegationEvent::BatchRevoked {
            by: caller,
            succeeded,
            ids: ids.to_vec(),
            timestamp: self.authority.now(),
        });
        Ok(report)
    }
}

impl std::fmt::Debug for BatchRevoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRevoker")
            .field("authority", &self.authority.address())
            .field("max_batch_size", &self.max_batch_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warrant_directory::AgentDirectory;
    use warrant_types::MemorySink;

    fn revoker() -> (BatchRevoker, MemorySink) {
        let authority = PermissionAuthority::new(Address::from_label("authority"), AgentDirectory::new());
        let sink = MemorySink::new();
        let revoker = BatchRevoker::new(authority).with_events(Arc::new(sink.clone()));
        (revoker, sink)
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let (revoker, sink) = revoker();
        let err = revoker
            .batch_revoke(Address::from_label("u"), &[])
            .await
            .unwrap_err();
        assert_eq!(err, WarrantError::EmptyBatch);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_batch_is_rejected() {
        let (revoker, _) = revoker();
        let revoker = revoker.with_max_batch_size(2);
        let err = revoker
            .batch_revoke(Address::from_label("u"), &[GrantId(1), GrantId(2), GrantId(3)])
            .await
            .unwrap_err();
        assert_eq!(err, WarrantError::BatchTooLarge { len: 3, max: 2 });
    }

    #[tokio::test]
    async fn test_all_failures_still_notify() {
        let (revoker, sink) = revoker();
        let ids = [GrantId(5), GrantId::NONE, GrantId(5)];
        let report = revoker
            .batch_revoke_detailed(Address::from_label("u"), &ids)
            .await
            .unwrap();
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 3);

        let events = sink.events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            DelegationEvent::BatchRevoked { succeeded, ids: seen, .. } => {
                assert_eq!(*succeeded, 0);
                assert_eq!(seen, &ids.to_vec());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_default_bound_comes_from_config() {
        let (revoker, _) = revoker();
        assert_eq!(revoker.max_batch_size(), 1024);
    }
}
