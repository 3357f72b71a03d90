//! Several engine instances sharing one store.
//!
//! Only the writer whose compare-and-set applies may charge the penalty, so
//! racing passes must never double-charge.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use futures::future::join_all;

use hygiene_tracker::ledger::SharedLedgerStore;
use hygiene_tracker::store::SharedTicketStore;
use hygiene_tracker::{
    JsonFileStore, LedgerStore, Location, ManualClock, MemoryLedgerStore, MemoryPhotoStore,
    MemoryTicketStore, NewTicket, NullNotifier, PartyId, Reporter, TicketState, TicketStore,
    Workflow,
};

fn new_ticket(block: &str, reporter_uid: &str) -> NewTicket {
    NewTicket {
        issue_category: "washroom".to_string(),
        description: "Blocked drain".to_string(),
        location: Location::parse(block).unwrap(),
        reporter: Reporter {
            uid: reporter_uid.to_string(),
            name: "Test Reporter".to_string(),
            registration_no: "21BCE0001".to_string(),
            phone: "9876543210".to_string(),
        },
    }
}

fn workers(
    n: usize,
    clock: &Arc<ManualClock>,
    tickets: SharedTicketStore,
    ledger: SharedLedgerStore,
) -> Vec<Workflow> {
    (0..n)
        .map(|_| {
            Workflow::new(
                clock.clone(),
                tickets.clone(),
                ledger.clone(),
                Arc::new(MemoryPhotoStore::new()),
                Arc::new(NullNotifier),
            )
        })
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_passes_charge_each_penalty_once() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
    ));
    let tickets: SharedTicketStore = Arc::new(MemoryTicketStore::new());
    let ledger: SharedLedgerStore = Arc::new(MemoryLedgerStore::new());
    let pool = workers(4, &clock, tickets.clone(), ledger.clone());

    let blocks = ["1", "2", "3", "4", "5"];
    for (i, block) in blocks.iter().enumerate() {
        pool[0]
            .submit_ticket(new_ticket(block, &format!("r{}", i)), None)
            .await
            .unwrap();
    }

    for minutes in [10, 30, 30] {
        clock.advance(Duration::minutes(minutes) + Duration::seconds(1));
        let reports = join_all(pool.iter().map(|w| w.run_escalation())).await;

        let applied: usize = reports.iter().map(|r| r.applied).sum();
        let stale: usize = reports.iter().map(|r| r.stale).sum();
        let decided: usize = reports.iter().map(|r| r.decided).sum();
        assert_eq!(applied, blocks.len());
        assert_eq!(applied + stale, decided);
        assert!(reports.iter().all(|r| r.failed == 0));
    }

    for block in blocks {
        let entry = ledger
            .get(&PartyId::new(format!("SUP-{}", block)))
            .await
            .unwrap();
        assert_eq!(entry.penalty_count, 2, "block {}", block);
        assert_eq!(entry.penalized.len(), 2);
    }
    let all = tickets.list_all().await.unwrap();
    assert!(all.iter().all(|t| t.state == TicketState::ClosedOverdue));
}

#[tokio::test]
async fn test_racing_passes_over_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path().join("store.json"))
        .await
        .unwrap()
        .shared();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
    ));
    let pool = workers(3, &clock, store.clone(), store.clone());

    let ticket = pool[0]
        .submit_ticket(new_ticket("36", "123"), None)
        .await
        .unwrap();
    clock.advance(Duration::minutes(10) + Duration::seconds(1));
    join_all(pool.iter().map(|w| w.run_escalation())).await;
    clock.advance(Duration::minutes(30) + Duration::seconds(1));
    let reports = join_all(pool.iter().map(|w| w.run_escalation())).await;
    assert_eq!(reports.iter().map(|r| r.penalties_charged).sum::<usize>(), 1);

    // A fresh handle sees the persisted result
    let reopened = JsonFileStore::open(dir.path().join("store.json"))
        .await
        .unwrap();
    let persisted = TicketStore::get(&reopened, &ticket.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(persisted.state, TicketState::EscalatedToAuthority);
    let entry = LedgerStore::get(&reopened, &PartyId::new("SUP-36"))
        .await
        .unwrap();
    assert_eq!(entry.penalty_count, 1);
    assert_eq!(entry.assigned_count, 1);
}
