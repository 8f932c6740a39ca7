//! Forwarding seam for mediated execution
//!
//! Children never reach a target directly; the authority forwards their
//! payload through a [`TargetRouter`] once the grant checks pass.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use warrant_types::{Address, GrantId};

/// A forwarded call as seen by the target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// The authority's own address
    pub from: Address,
    /// Grant the call was authorized under
    pub grant_id: GrantId,
    /// Attached transfer amount
    pub value: u64,
    /// Full payload, selector included
    pub payload: Vec<u8>,
}

/// An endpoint that accepts forwarded calls
///
/// `Ok` carries return data; `Err` carries the failure payload, which the
/// authority surfaces to the caller unchanged.
#[async_trait]
pub trait CallTarget: Send + Sync {
    async fn call(&self, ctx: CallContext) -> Result<Vec<u8>, Vec<u8>>;
}

/// Address book of reachable targets. Clones share the same table.
#[derive(Clone, Default)]
pub struct TargetRouter {
    targets: Arc<RwLock<HashMap<Address, Arc<dyn CallTarget>>>>,
}

impl TargetRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `target` reachable at `address`, replacing any previous endpoint
    pub fn register(&self, address: Address, target: Arc<dyn CallTarget>) {
        self.targets.write().insert(address, target);
    }

    pub fn unregister(&self, address: &Address) -> bool {
        self.targets.write().remove(address).is_some()
    }

    pub fn route(&self, address: &Address) -> Option<Arc<dyn CallTarget>> {
        self.targets.read().get(address).cloned()
    }

    pub fn len(&self) -> usize {
        self.targets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.read().is_empty()
    }
}

impl std::fmt::Debug for TargetRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetRouter")
            .field("targets", &self.targets.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl CallTarget for Echo {
        async fn call(&self, ctx: CallContext) -> Result<Vec<u8>, Vec<u8>> {
            Ok(ctx.payload)
        }
    }

    #[tokio::test]
    async fn test_register_and_route() {
        let router = TargetRouter::new();
        let address = Address::from_label("echo");
        assert!(router.route(&address).is_none());

        router.register(address, Arc::new(Echo));
        let target = router.route(&address).unwrap();
        let out = target
            .call(CallContext {
                from: Address::ZERO,
                grant_id: GrantId(1),
                value: 0,
                payload: vec![1, 2, 3, 4],
            })
            .await
            .unwrap();
        assert_eq!(out, vec![1, 2, 3, 4]);

        assert!(router.unregister(&address));
        assert!(router.is_empty());
    }
}
