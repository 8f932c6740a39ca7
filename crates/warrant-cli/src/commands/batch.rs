//! Bulk revocation walkthrough
//!
//! Issues a handful of grants, revokes one directly, then batch-revokes the
//! whole list plus an id that never existed.

use anyhow::Result;
use chrono::Duration;
use warrant_authority::GrantRequest;
use warrant_types::{Address, Capabilities, Clock, GrantId, Selector, WarrantConfig};

use super::Deployment;
use crate::display;

pub async fn run(config: &WarrantConfig, grants: usize) -> Result<Deployment> {
    let user = Address::from_label("user.U");
    let master = Address::from_label("master.M");
    let child = Address::from_label("child.X");
    let target = Address::from_label("target.D");

    let world = Deployment::new(config, target);
    let (directory, authority) = (&world.directory, &world.authority);

    directory
        .register_master(user, master, Capabilities::ALL, "primary master")
        .await?;
    authority.bind_master(user, master).await?;
    directory
        .register_child(master, child, Capabilities::TRANSFER, "worker")
        .await?;

    let expiry = world.clock.now() + Duration::hours(6);
    let mut ids = Vec::with_capacity(grants + 1);
    for n in 0..grants {
        let selector = Selector::from_signature(&format!("op{}()", n));
        ids.push(
            authority
                .grant(master, GrantRequest::new(child, target, expiry).with_selector(selector))
                .await?,
        );
    }
    if let Some(first) = ids.first() {
        authority.revoke(master, *first).await?;
        display::info(&format!("{} revoked ahead of the batch", first));
    }
    ids.push(GrantId(u64::MAX));

    display::section("Batch revoke");
    let report = world.batch.batch_revoke_detailed(user, &ids).await?;
    for item in &report.items {
        match &item.error {
            None => display::success(&format!("{} revoked", item.grant_id)),
            Some(e) => display::rejected(&format!("{} skipped: {}", item.grant_id, e.error_code())),
        }
    }
    display::kv("succeeded", &report.succeeded().to_string());
    display::kv("skipped", &report.failed().to_string());

    Ok(world)
}
