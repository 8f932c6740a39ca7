//! Full teardown walkthrough
//!
//! A master with several children and grants is torn down by its owner:
//! every grant is revoked, the binding is released and the children are
//! deactivated in the directory.

use anyhow::Result;
use chrono::Duration;
use warrant_authority::GrantRequest;
use warrant_types::{Address, Capabilities, Clock, Selector, WarrantConfig};

use super::Deployment;
use crate::display;

pub async fn run(config: &WarrantConfig, children: usize, grants_per_child: usize) -> Result<Deployment> {
    let user = Address::from_label("user.U");
    let master = Address::from_label("master.M");
    let target = Address::from_label("target.D");

    let world = Deployment::new(config, target);
    let (directory, authority) = (&world.directory, &world.authority);

    display::section("Setup");
    directory
        .register_master(user, master, Capabilities::ALL, "primary master")
        .await?;
    authority.bind_master(user, master).await?;

    let expiry = world.clock.now() + Duration::days(1);
    for c in 0..children {
        let child = Address::from_label(&format!("child.{}", c));
        directory
            .register_child(master, child, Capabilities::TRADE, format!("worker {}", c))
            .await?;
        for g in 0..grants_per_child {
            let selector = Selector::from_signature(&format!("op{}()", g));
            authority
                .grant(master, GrantRequest::new(child, target, expiry).with_selector(selector))
                .await?;
        }
    }
    display::success(&format!(
        "{} children holding {} grants",
        children,
        authority.grant_count().await
    ));

    display::section("Teardown");
    let revoked = authority.revoke_master(user).await?;
    display::success(&format!("revoke_master revoked {} grant(s)", revoked));
    directory.deactivate_all_children(user, master).await?;
    display::success(&format!(
        "{} active children remain",
        directory.active_children_of(&master).await.len()
    ));
    display::kv("has_master(U)", &authority.has_master(&user).await.to_string());

    let again = authority.revoke_all_for_master(master, master).await;
    match again {
        Ok(n) => display::info(&format!("second cascade revoked {}", n)),
        Err(e) => display::rejected(&e.to_string()),
    }

    Ok(world)
}
