//! Workflow behavior against mocked collaborators.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use futures::executor::block_on;
use mockall::mock;

use hygiene_tracker::notify::{Alert, NotifyError};
use hygiene_tracker::photo::{PhotoError, PhotoResult};
use hygiene_tracker::ticket::TimelineEvent;
use hygiene_tracker::{
    Actor, AlertKind, Location, ManualClock, MemoryLedgerStore, MemoryTicketStore, NewTicket,
    Notifier, NullNotifier, PhotoPayload, PhotoStore, Reporter, TicketPatch, TicketState,
    TicketStore, TrackerError, Workflow,
};

mock! {
    pub Photos {}

    #[async_trait]
    impl PhotoStore for Photos {
        async fn upload(&self, payload: PhotoPayload, suggested_name: &str) -> PhotoResult<String>;
        async fn delete(&self, url: &str) -> PhotoResult<()>;
    }
}

mock! {
    pub Alerts {}

    #[async_trait]
    impl Notifier for Alerts {
        async fn notify(&self, alert: &Alert) -> Result<(), NotifyError>;
    }
}

fn new_ticket(block: &str, reporter_uid: &str) -> NewTicket {
    NewTicket {
        issue_category: "washroom".to_string(),
        description: "No soap in dispenser".to_string(),
        location: Location::parse(block).unwrap(),
        reporter: Reporter {
            uid: reporter_uid.to_string(),
            name: "Test Reporter".to_string(),
            registration_no: "21BCE0001".to_string(),
            phone: "9876543210".to_string(),
        },
    }
}

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
    ))
}

#[tokio::test]
async fn test_failed_upload_creates_nothing() {
    let mut photos = MockPhotos::new();
    photos
        .expect_upload()
        .times(1)
        .returning(|_, _| Err(PhotoError::Unavailable("bucket offline".to_string())));
    photos.expect_delete().never();

    let store = Arc::new(MemoryTicketStore::new());
    let workflow = Workflow::new(
        clock(),
        store.clone(),
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(photos),
        Arc::new(NullNotifier),
    );

    let err = workflow
        .submit_ticket(new_ticket("36", "123"), Some(PhotoPayload::jpeg(vec![1])))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::UploadFailed { .. }));
    assert!(err.is_retryable());
    assert!(store.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_resolution_upload_leaves_state_unchanged() {
    let mut photos = MockPhotos::new();
    photos
        .expect_upload()
        .withf(|_, name| name.ends_with("_resolution.jpg"))
        .times(1)
        .returning(|_, _| Err(PhotoError::Unavailable("timeout".to_string())));

    let workflow = Workflow::new(
        clock(),
        Arc::new(MemoryTicketStore::new()),
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(photos),
        Arc::new(NullNotifier),
    );

    let ticket = workflow
        .submit_ticket(new_ticket("36", "123"), None)
        .await
        .unwrap();
    workflow.accept(&ticket.id, Actor::user("SUP-36")).await.unwrap();

    let err = workflow
        .submit_resolution(&ticket.id, Actor::user("SUP-36"), PhotoPayload::jpeg(vec![1]))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::UploadFailed { .. }));

    let after = workflow.ticket(&ticket.id).await.unwrap();
    assert_eq!(after.state, TicketState::AwaitingResolution);
    assert!(after.evidence.resolution_photo.is_none());
}

#[tokio::test]
async fn test_refused_transition_uploads_nothing() {
    let mut photos = MockPhotos::new();
    photos.expect_upload().never();
    photos.expect_delete().never();

    let workflow = Workflow::new(
        clock(),
        Arc::new(MemoryTicketStore::new()),
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(photos),
        Arc::new(NullNotifier),
    );

    // Not accepted yet, so resolving is refused before any upload
    let ticket = workflow
        .submit_ticket(new_ticket("36", "123"), None)
        .await
        .unwrap();
    let err = workflow
        .submit_resolution(&ticket.id, Actor::user("SUP-36"), PhotoPayload::jpeg(vec![1]))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_lost_race_deletes_only_its_own_upload() {
    let store = Arc::new(MemoryTicketStore::new());
    let racer = store.clone();

    let mut photos = MockPhotos::new();
    photos.expect_upload().times(1).returning(move |_, name| {
        // Another writer escalates the ticket while the upload is in flight
        let ticket = block_on(racer.list_all()).unwrap().remove(0);
        let patch = TicketPatch::transition(
            &ticket,
            TicketState::EscalatedToAuthority,
            TimelineEvent::new("Escalated by another poller", ticket.submitted_at, Actor::system()),
        );
        block_on(racer.update(&patch)).unwrap();
        Ok(format!("mem://photos/1772442000000_{}", name))
    });
    photos
        .expect_delete()
        .withf(|url| url.starts_with("mem://photos/1772442000000_") && url.ends_with("_resolution.jpg"))
        .times(1)
        .returning(|_| Ok(()));

    let workflow = Workflow::new(
        clock(),
        store.clone(),
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(photos),
        Arc::new(NullNotifier),
    );
    let ticket = workflow
        .submit_ticket(new_ticket("36", "123"), None)
        .await
        .unwrap();
    workflow.accept(&ticket.id, Actor::user("SUP-36")).await.unwrap();

    let err = workflow
        .submit_resolution(&ticket.id, Actor::user("SUP-36"), PhotoPayload::jpeg(vec![1]))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::DuplicateTransition { .. }));

    let after = workflow.ticket(&ticket.id).await.unwrap();
    assert_eq!(after.state, TicketState::EscalatedToAuthority);
    assert!(after.evidence.resolution_photo.is_none());
}

#[tokio::test]
async fn test_auto_accept_alert_fires_once_per_party() {
    let mut alerts = MockAlerts::new();
    alerts
        .expect_notify()
        .withf(|alert| alert.kind == AlertKind::AutoAccepted && alert.party.as_str() == "SUP-36")
        .times(1)
        .returning(|_| Ok(()));
    alerts
        .expect_notify()
        .withf(|alert| alert.party.as_str() == "SUP-12")
        .times(1)
        .returning(|_| Ok(()));

    let clock = clock();
    let workflow = Workflow::new(
        clock.clone(),
        Arc::new(MemoryTicketStore::new()),
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(MockPhotos::new()),
        Arc::new(alerts),
    );
    workflow.submit_ticket(new_ticket("36", "1"), None).await.unwrap();
    workflow.submit_ticket(new_ticket("36-2nd", "2"), None).await.unwrap();
    workflow.submit_ticket(new_ticket("12", "3"), None).await.unwrap();

    clock.advance(Duration::minutes(11));
    let report = workflow.run_escalation().await;
    assert_eq!(report.applied, 3);
}

#[tokio::test]
async fn test_notifier_failure_does_not_block_transition() {
    let mut alerts = MockAlerts::new();
    alerts
        .expect_notify()
        .returning(|_| Err(NotifyError("push gateway down".to_string())));

    let clock = clock();
    let workflow = Workflow::new(
        clock.clone(),
        Arc::new(MemoryTicketStore::new()),
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(MockPhotos::new()),
        Arc::new(alerts),
    );
    let ticket = workflow
        .submit_ticket(new_ticket("36", "1"), None)
        .await
        .unwrap();

    clock.advance(Duration::minutes(11));
    workflow.run_escalation().await;
    let after = workflow.ticket(&ticket.id).await.unwrap();
    assert_eq!(after.state, TicketState::AwaitingResolution);
    assert!(after.flags.auto_accepted);
}
