use std::sync::Arc;

use chrono::Duration;
use warrant_authority::{GrantRequest, PermissionAuthority};
use warrant_batch::BatchRevoker;
use warrant_directory::AgentDirectory;
use warrant_types::{Address, Capabilities, Clock, DelegationEvent, GrantId, ManualClock, MemorySink, Selector};

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

struct Setup {
    authority: PermissionAuthority,
    revoker: BatchRevoker,
    sink: MemorySink,
    ids: Vec<GrantId>,
}

/// U binds M, M registers X and grants it `count` permissions on D
async fn setup(count: usize) -> Setup {
    let clock = ManualClock::starting_now();
    let sink = MemorySink::new();
    let directory = AgentDirectory::with_components(Arc::new(clock.clone()), Arc::new(sink.clone()));
    let authority = PermissionAuthority::new(addr("authority"), directory.clone())
        .with_clock(Arc::new(clock.clone()))
        .with_events(Arc::new(sink.clone()));

    directory
        .register_master(addr("U"), addr("M"), Capabilities::ALL, "")
        .await
        .unwrap();
    authority.bind_master(addr("U"), addr("M")).await.unwrap();
    directory
        .register_child(addr("M"), addr("X"), Capabilities::TRANSFER, "")
        .await
        .unwrap();

    let mut ids = vec![];
    for n in 0..count {
        let request = GrantRequest::new(addr("X"), addr("D"), clock.now() + Duration::days(1))
            .with_selector(Selector::from_signature(&format!("op{}()", n)));
        ids.push(authority.grant(addr("M"), request).await.unwrap());
    }

    let revoker = BatchRevoker::new(authority.clone()).with_events(Arc::new(sink.clone()));
    Setup {
        authority,
        revoker,
        sink,
        ids,
    }
}

#[tokio::test]
async fn test_batch_isolation() {
    let s = setup(3).await;
    let (a, b, c) = (s.ids[0], s.ids[1], s.ids[2]);
    s.authority.revoke(addr("M"), b).await.unwrap();
    s.sink.clear();

    let succeeded = s.revoker.batch_revoke(addr("M"), &[a, b, c]).await.unwrap();
    assert_eq!(succeeded, 2);
    assert!(!s.authority.is_valid(a).await);
    assert!(!s.authority.is_valid(c).await);
    assert!(!s.authority.grant_info(b).await.unwrap().active);

    assert_eq!(s.sink.names(), vec!["GrantRevoked", "GrantRevoked", "BatchRevoked"]);
    match s.sink.events().last() {
        Some(DelegationEvent::BatchRevoked { succeeded, ids, by, .. }) => {
            assert_eq!(*succeeded, 2);
            assert_eq!(ids, &vec![a, b, c]);
            assert_eq!(*by, addr("M"));
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[tokio::test]
async fn test_every_item_is_attempted_once() {
    let s = setup(2).await;
    let (a, b) = (s.ids[0], s.ids[1]);

    // Duplicates: the second attempt at `a` finds it inactive
    let report = s
        .revoker
        .batch_revoke_detailed(addr("U"), &[a, GrantId(42), a, b])
        .await
        .unwrap();
    assert_eq!(report.items.len(), 4);
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.revoked(), vec![a, b]);
    assert_eq!(report.items[1].error.as_ref().map(|e| e.error_code()), Some("NOT_FOUND"));
    assert_eq!(report.items[2].error.as_ref().map(|e| e.error_code()), Some("NOT_ACTIVE"));
}

#[tokio::test]
async fn test_unauthorized_items_are_skipped() {
    let s = setup(2).await;

    let succeeded = s.revoker.batch_revoke(addr("X"), &s.ids).await.unwrap();
    assert_eq!(succeeded, 0);
    for id in &s.ids {
        assert!(s.authority.is_valid(*id).await);
    }
}

#[tokio::test]
async fn test_batch_after_cascade_is_a_no_op() {
    let s = setup(3).await;
    assert_eq!(s.authority.revoke_all_for_master(addr("M"), addr("M")).await.unwrap(), 3);

    let succeeded = s.revoker.batch_revoke(addr("M"), &s.ids).await.unwrap();
    assert_eq!(succeeded, 0);
}
