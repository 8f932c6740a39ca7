//! The basic delegation walkthrough
//!
//! User U binds master M, M registers child X and grants it selector `f`
//! on target D. X executes through the grant, is refused `g`, and loses
//! access once M revokes everything.

use anyhow::Result;
use chrono::Duration;
use warrant_authority::GrantRequest;
use warrant_types::{Address, Capabilities, Clock, Selector, WarrantConfig};

use super::Deployment;
use crate::display;

pub async fn run(config: &WarrantConfig, show_expiry: bool) -> Result<Deployment> {
    let user = Address::from_label("user.U");
    let master = Address::from_label("master.M");
    let child = Address::from_label("child.X");
    let target = Address::from_label("target.D");
    let f = Selector::from_signature("f()");
    let g = Selector::from_signature("g()");

    let world = Deployment::new(config, target);
    let (directory, authority) = (&world.directory, &world.authority);

    display::section("Setup");
    directory
        .register_master(user, master, Capabilities::ALL, "primary master")
        .await?;
    display::success(&format!("registered master {}", master));
    authority.bind_master(user, master).await?;
    display::success(&format!("{} bound master {}", user, master));
    directory
        .register_child(master, child, Capabilities::TRANSFER, "worker")
        .await?;
    display::success(&format!("registered child {}", child));

    display::section("Grant");
    let expiry = world.clock.now() + Duration::hours(1);
    let id = authority
        .grant(master, GrantRequest::new(child, target, expiry).with_selector(f).with_max_value(100))
        .await?;
    display::success(&format!("issued {}", id));
    display::kv("selector f", &f.to_string());
    display::kv("expiry", &expiry.to_rfc3339());
    display::kv(
        "has_permission(X, D, f)",
        &authority.has_permission(&child, &target, &f).await.to_string(),
    );
    display::kv(
        "has_permission(X, D, g)",
        &authority.has_permission(&child, &target, &g).await.to_string(),
    );

    display::section("Execute");
    let mut payload = f.as_bytes().to_vec();
    payload.extend_from_slice(b"args");
    let echoed = authority.execute_through(child, id, payload, 40).await?;
    display::success(&format!("forwarded {} bytes with value 40", echoed.len()));
    match authority.execute_through(child, id, g.as_bytes().to_vec(), 0).await {
        Ok(_) => display::info("selector g unexpectedly allowed"),
        Err(e) => display::rejected(&e.to_string()),
    }
    match authority.execute_through(child, id, f.as_bytes().to_vec(), 500).await {
        Ok(_) => display::info("value 500 unexpectedly allowed"),
        Err(e) => display::rejected(&e.to_string()),
    }

    if show_expiry {
        display::section("Expiry");
        world.clock.set(expiry);
        display::kv("is_valid at expiry", &authority.is_valid(id).await.to_string());
        world.clock.set(expiry - Duration::hours(1));
    }

    display::section("Revoke");
    let count = authority.revoke_all_for_master(master, master).await?;
    display::success(&format!("revoked {} grant(s)", count));
    display::kv(
        "has_permission(X, D, f)",
        &authority.has_permission(&child, &target, &f).await.to_string(),
    );

    Ok(world)
}
