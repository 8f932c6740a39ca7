use std::sync::Arc;

use chrono::Duration;
use warrant_audit::{AuditJournal, EventBus, Fanout};
use warrant_authority::{GrantRequest, PermissionAuthority};
use warrant_directory::AgentDirectory;
use warrant_types::{Address, Capabilities, Clock, DelegationEvent, ManualClock, Selector};

fn addr(label: &str) -> Address {
    Address::from_label(label)
}

#[tokio::test]
async fn test_journal_records_full_delegation_trail() {
    let clock = ManualClock::starting_now();
    let journal = AuditJournal::new();
    let bus = EventBus::new(64);
    let mut live = bus.subscribe();
    let sink = Arc::new(
        Fanout::new()
            .with(Arc::new(journal.clone()))
            .with(Arc::new(bus.clone())),
    );

    let directory = AgentDirectory::with_components(Arc::new(clock.clone()), sink.clone());
    let authority = PermissionAuthority::new(addr("authority"), directory.clone())
        .with_clock(Arc::new(clock.clone()))
        .with_events(sink);

    directory
        .register_master(addr("U"), addr("M"), Capabilities::ALL, "")
        .await
        .unwrap();
    authority.bind_master(addr("U"), addr("M")).await.unwrap();
    directory
        .register_child(addr("M"), addr("X"), Capabilities::TRANSFER, "")
        .await
        .unwrap();
    let id = authority
        .grant(
            addr("M"),
            GrantRequest::new(addr("X"), addr("D"), clock.now() + Duration::hours(1))
                .with_selector(Selector::from_signature("f()")),
        )
        .await
        .unwrap();
    authority.revoke_master(addr("U")).await.unwrap();

    assert_eq!(journal.len(), 6);
    assert!(journal.verify_chain());

    let for_child: Vec<_> = journal
        .entries_for(&addr("X"))
        .into_iter()
        .map(|e| e.event.name())
        .collect();
    assert_eq!(for_child, vec!["AgentRegistered", "GrantCreated"]);

    match journal.entries()[5].event.clone() {
        DelegationEvent::MasterRevoked { grants_revoked, .. } => assert_eq!(grants_revoked, 1),
        other => panic!("unexpected event {:?}", other),
    }
    match journal.entries()[4].event.clone() {
        DelegationEvent::AllGrantsRevoked { revoked, .. } => assert_eq!(revoked, vec![id]),
        other => panic!("unexpected event {:?}", other),
    }

    let first = live.recv().await.unwrap();
    assert_eq!(first.name(), "AgentRegistered");
}
