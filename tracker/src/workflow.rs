//! Workflow service
//!
//! Wires the clock, ticket store, ledger, photo store, notifier and event
//! bus around the pure escalation code. Every user action and every engine
//! pass goes through here:
//!
//! ```text
//! action / poll tick
//!   │
//!   ├─ read ticket(s)           (cached snapshot if the store is down)
//!   ├─ build patch              (escalation::engine / escalation::transitions)
//!   ├─ compare-and-set update   (stale → another writer won, skip silently)
//!   └─ side effects             (ledger, photo purge, alerts, events)
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::clock::SharedClock;
use crate::error::{TrackerError, TrackerResult};
use crate::escalation::transitions::{self, SideEffect, Transition, VendorDecision};
use crate::escalation::{EscalationEngine, PenaltyEvent, Tier};
use crate::events::{EventBus, SharedEventBus, TicketEvent};
use crate::ledger::{LedgerEntry, RankedParty, ScoringLedger, SharedLedgerStore};
use crate::notify::{Alert, AlertKind, AlertThrottle, SharedNotifier};
use crate::photo::{PhotoPayload, SharedPhotoStore};
use crate::resilience::{DegradationLevel, DegradedResponse};
use crate::store::{CachedTicketStore, PatchOutcome, SharedTicketStore, TicketStore};
use crate::ticket::{Actor, NewTicket, PartyId, Ticket, TicketId, TicketPatch, TicketState};

/// Shared reference to Workflow
pub type SharedWorkflow = Arc<Workflow>;

/// What one engine pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub evaluated_at: Option<DateTime<Utc>>,
    pub evaluated: usize,
    /// Transitions the engine decided on
    pub decided: usize,
    pub applied: usize,
    /// Lost the compare-and-set to another writer
    pub stale: usize,
    pub missing: usize,
    /// Store writes that failed; retried next pass
    pub failed: usize,
    pub penalties_charged: usize,
    /// Evaluated against a cached snapshot
    pub degraded: bool,
}

impl PassReport {
    /// Get a summary for logging
    pub fn summary(&self) -> String {
        format!(
            "evaluated={} decided={} applied={} stale={} missing={} failed={} penalties={}{}",
            self.evaluated,
            self.decided,
            self.applied,
            self.stale,
            self.missing,
            self.failed,
            self.penalties_charged,
            if self.degraded { " (degraded)" } else { "" }
        )
    }
}

/// Orchestrates tickets, ledger and collaborators
pub struct Workflow {
    clock: SharedClock,
    tickets: Arc<CachedTicketStore>,
    ledger: ScoringLedger,
    photos: SharedPhotoStore,
    notifier: SharedNotifier,
    throttle: AlertThrottle,
    events: SharedEventBus,
    engine: EscalationEngine,
}

impl Workflow {
    pub fn new(
        clock: SharedClock,
        tickets: SharedTicketStore,
        ledger: SharedLedgerStore,
        photos: SharedPhotoStore,
        notifier: SharedNotifier,
    ) -> Self {
        let tickets = Arc::new(CachedTicketStore::new(tickets, clock.clone()));
        let ledger = ScoringLedger::new(ledger, tickets.clone());
        Self {
            clock,
            tickets,
            ledger,
            photos,
            notifier,
            throttle: AlertThrottle::new(),
            events: EventBus::new().shared(),
            engine: EscalationEngine::new(),
        }
    }

    /// Create a shared reference to this workflow
    pub fn shared(self) -> SharedWorkflow {
        Arc::new(self)
    }

    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Every ticket; falls back to the last snapshot if the store is down
    pub async fn snapshot(&self) -> DegradedResponse<Vec<Ticket>> {
        self.tickets.read_all().await
    }

    pub async fn ticket(&self, id: &TicketId) -> TrackerResult<Ticket> {
        self.tickets
            .get(id)
            .await?
            .ok_or_else(|| TrackerError::not_found(id))
    }

    pub async fn ledger_entry(&self, party: &PartyId) -> TrackerResult<LedgerEntry> {
        self.ledger.entry(party).await
    }

    pub async fn ranking(&self) -> TrackerResult<Vec<RankedParty>> {
        self.ledger.ranking().await
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// File a new complaint.
    ///
    /// Refused while the reporter still has a resolution to review. If the
    /// photo upload fails nothing is created.
    pub async fn submit_ticket(
        &self,
        new: NewTicket,
        photo: Option<PhotoPayload>,
    ) -> TrackerResult<Ticket> {
        let existing = self.tickets.read_all().await;
        if existing.level == DegradationLevel::Unavailable {
            return Err(TrackerError::store_unavailable(existing.warnings.join("; ")));
        }
        if let Some(pending) = existing.payload.iter().find(|t| {
            t.reporter.uid == new.reporter.uid && t.state == TicketState::AwaitingReporterReview
        }) {
            return Err(TrackerError::ReviewPending {
                reporter: new.reporter.uid.clone(),
                ticket_id: pending.id.clone(),
            });
        }

        let now = self.clock.now();
        let mut ticket = Ticket::open(new, None, now);
        if let Some(payload) = photo {
            let name = format!("{}_issue.jpg", ticket.id);
            ticket.evidence.reporter_photo = Some(self.upload(payload, &name).await?);
        }

        if let Err(e) = self.tickets.insert(ticket.clone()).await {
            if let Some(url) = ticket.evidence.reporter_photo.as_deref() {
                self.delete_photo(url).await;
            }
            return Err(e.into());
        }

        if let Err(e) = self.ledger.record_assignment(&ticket.responsible_party).await {
            warn!(party = %ticket.responsible_party, error = %e, "Failed to record assignment");
        }

        info!(
            ticket_id = %ticket.id,
            party = %ticket.responsible_party,
            location = %ticket.location,
            "Complaint registered"
        );
        self.events.publish(TicketEvent::TicketSubmitted {
            ticket_id: ticket.id.clone(),
            party: ticket.responsible_party.clone(),
            timestamp: now,
        });
        Ok(ticket)
    }

    // =========================================================================
    // Engine pass
    // =========================================================================

    /// Evaluate every ticket once and apply what lapsed.
    ///
    /// Safe to run from several pollers at once: the compare-and-set update
    /// lets exactly one of them apply each transition, and only the writer
    /// whose patch applied charges the penalty.
    pub async fn run_escalation(&self) -> PassReport {
        let now = self.clock.now();
        let snapshot = self.tickets.read_all().await;
        let outcome = self.engine.evaluate(now, &snapshot.payload);

        let mut report = PassReport {
            evaluated_at: Some(now),
            evaluated: outcome.tickets_evaluated,
            decided: outcome.transitions.len(),
            degraded: snapshot.is_degraded(),
            ..Default::default()
        };

        for timed in outcome.transitions {
            let ticket_id = timed.patch.ticket_id.clone();
            match self.tickets.update(&timed.patch).await {
                Ok(PatchOutcome::Applied(ticket)) => {
                    report.applied += 1;
                    info!(
                        ticket_id = %ticket_id,
                        party = %ticket.responsible_party,
                        tier = %timed.tier,
                        to = %ticket.state,
                        "Deadline lapsed"
                    );
                    self.announce(&timed.patch, &ticket, now);

                    if let Some(penalty) = &timed.penalty {
                        if self.charge(penalty, now).await {
                            report.penalties_charged += 1;
                        }
                    }
                    if timed.tier == Tier::Acceptance {
                        self.alert(AlertKind::AutoAccepted, &ticket, now).await;
                    }
                }
                Ok(PatchOutcome::Stale { actual }) => {
                    report.stale += 1;
                    let err = TrackerError::DuplicateTransition {
                        ticket_id: ticket_id.clone(),
                        actual,
                    };
                    debug!(tier = %timed.tier, "{}", err);
                }
                Ok(PatchOutcome::Missing) => {
                    report.missing += 1;
                    warn!(ticket_id = %ticket_id, "Ticket vanished before its transition applied");
                }
                Err(e) => {
                    report.failed += 1;
                    let err = TrackerError::from(e);
                    if err.is_retryable() {
                        warn!(ticket_id = %ticket_id, tier = %timed.tier, error = %err, "Transition not applied; retrying next pass");
                    } else {
                        error!(ticket_id = %ticket_id, tier = %timed.tier, error = %err, "Transition failed");
                    }
                }
            }
        }

        if report.applied > 0 || report.failed > 0 {
            info!("Escalation pass: {}", report.summary());
        } else {
            debug!("Escalation pass: {}", report.summary());
        }
        self.events.publish(TicketEvent::EscalationPassCompleted {
            evaluated: report.evaluated,
            applied: report.applied,
            stale: report.stale,
            penalties: report.penalties_charged,
            degraded: report.degraded,
            timestamp: now,
        });
        report
    }

    // =========================================================================
    // Manual transitions
    // =========================================================================

    pub async fn accept(&self, id: &TicketId, actor: Actor) -> TrackerResult<Ticket> {
        self.apply_manual(id, |ticket, now| transitions::accept(ticket, now, actor))
            .await
    }

    /// Upload resolution evidence and move the ticket to reporter review
    pub async fn submit_resolution(
        &self,
        id: &TicketId,
        actor: Actor,
        photo: PhotoPayload,
    ) -> TrackerResult<Ticket> {
        self.apply_with_photo(id, photo, "resolution", |ticket, now, url| {
            transitions::submit_resolution(ticket, now, actor.clone(), url)
        })
        .await
    }

    pub async fn rate(&self, id: &TicketId, actor: Actor, rating: u8) -> TrackerResult<Ticket> {
        self.apply_manual(id, |ticket, now| transitions::rate(ticket, now, actor, rating))
            .await
    }

    pub async fn reject(&self, id: &TicketId, actor: Actor) -> TrackerResult<Ticket> {
        self.apply_manual(id, |ticket, now| transitions::reject(ticket, now, actor))
            .await
    }

    /// Authority closes an escalated ticket with its own evidence
    pub async fn authority_resolve(
        &self,
        id: &TicketId,
        actor: Actor,
        photo: PhotoPayload,
    ) -> TrackerResult<Ticket> {
        self.apply_with_photo(id, photo, "ao_resolution", |ticket, now, url| {
            transitions::authority_resolve(ticket, now, actor.clone(), url)
        })
        .await
    }

    pub async fn summon(&self, id: &TicketId, actor: Actor) -> TrackerResult<Ticket> {
        let ticket = self
            .apply_manual(id, |ticket, now| transitions::summon(ticket, now, actor))
            .await?;
        self.alert(AlertKind::Summoned, &ticket, self.clock.now()).await;
        Ok(ticket)
    }

    pub async fn clear_review(&self, id: &TicketId, actor: Actor) -> TrackerResult<Ticket> {
        self.apply_manual(id, |ticket, now| transitions::clear_review(ticket, now, actor))
            .await
    }

    pub async fn escalate_to_vendor(&self, id: &TicketId, actor: Actor) -> TrackerResult<Ticket> {
        self.apply_manual(id, |ticket, now| {
            transitions::escalate_to_vendor(ticket, now, actor)
        })
        .await
    }

    pub async fn vendor_decide(
        &self,
        id: &TicketId,
        actor: Actor,
        decision: VendorDecision,
    ) -> TrackerResult<Ticket> {
        self.apply_manual(id, |ticket, now| {
            transitions::vendor_decide(ticket, now, actor, decision)
        })
        .await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn apply_manual(
        &self,
        id: &TicketId,
        build: impl FnOnce(&Ticket, DateTime<Utc>) -> TrackerResult<Transition>,
    ) -> TrackerResult<Ticket> {
        let current = self.ticket(id).await?;
        let now = self.clock.now();
        let transition = build(&current, now)?;
        self.commit(transition, now).await
    }

    /// Check the transition, upload, then commit.
    ///
    /// A refused transition never uploads and a failed upload leaves the
    /// ticket untouched. If the commit loses a race, only this call's own
    /// upload is deleted.
    async fn apply_with_photo(
        &self,
        id: &TicketId,
        photo: PhotoPayload,
        label: &str,
        build: impl Fn(&Ticket, DateTime<Utc>, String) -> TrackerResult<Transition>,
    ) -> TrackerResult<Ticket> {
        let current = self.ticket(id).await?;
        build(&current, self.clock.now(), String::new())?;
        let url = self
            .upload(photo, &format!("{}_{}.jpg", current.id, label))
            .await?;

        let now = self.clock.now();
        let result = match build(&current, now, url.clone()) {
            Ok(transition) => self.commit(transition, now).await,
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.delete_photo(&url).await;
        }
        result
    }

    async fn commit(&self, transition: Transition, now: DateTime<Utc>) -> TrackerResult<Ticket> {
        let Transition { patch, effects } = transition;
        let ticket = match self.tickets.update(&patch).await? {
            PatchOutcome::Applied(ticket) => *ticket,
            PatchOutcome::Stale { actual } => {
                return Err(TrackerError::DuplicateTransition {
                    ticket_id: patch.ticket_id.clone(),
                    actual,
                })
            }
            PatchOutcome::Missing => return Err(TrackerError::not_found(&patch.ticket_id)),
        };

        info!(
            ticket_id = %ticket.id,
            from = %patch.expected_state,
            to = %ticket.state,
            actor = %patch.timeline_event.actor,
            "Ticket updated"
        );
        self.announce(&patch, &ticket, now);
        self.run_effects(&ticket, effects, now).await;
        Ok(ticket)
    }

    /// Carry out post-transition work; failures are logged, not returned
    async fn run_effects(&self, ticket: &Ticket, effects: Vec<SideEffect>, now: DateTime<Utc>) {
        for effect in effects {
            match effect {
                SideEffect::RecordResolution { party, on_time } => {
                    if let Err(e) = self.ledger.record_resolution(&party, on_time).await {
                        error!(ticket_id = %ticket.id, party = %party, error = %e, "Failed to record resolution");
                    }
                }
                SideEffect::RecordRating { party, rating } => {
                    if let Err(e) = self.ledger.record_rating(&party, &ticket.id, rating).await {
                        error!(ticket_id = %ticket.id, party = %party, error = %e, "Failed to record rating");
                    }
                }
                SideEffect::ChargePenalty(penalty) => {
                    self.charge(&penalty, now).await;
                }
                SideEffect::PurgePhotos { urls } => {
                    for url in urls {
                        self.delete_photo(&url).await;
                    }
                }
            }
        }
    }

    /// Charge a penalty; true if the ledger changed
    async fn charge(&self, penalty: &PenaltyEvent, now: DateTime<Utc>) -> bool {
        match self.ledger.add_penalty(penalty).await {
            Ok(entry) => {
                self.events.publish(TicketEvent::PenaltyCharged {
                    ticket_id: penalty.ticket_id.clone(),
                    party: penalty.party.clone(),
                    tier_key: penalty.tier_key,
                    penalty_count: entry.penalty_count,
                    timestamp: now,
                });
                true
            }
            Err(e) if e.is_silent() => false,
            Err(e) => {
                error!(
                    ticket_id = %penalty.ticket_id,
                    party = %penalty.party,
                    tier = %penalty.tier_key,
                    error = %e,
                    "Failed to charge penalty"
                );
                false
            }
        }
    }

    fn announce(&self, patch: &TicketPatch, ticket: &Ticket, now: DateTime<Utc>) {
        self.events.publish(TicketEvent::TransitionApplied {
            ticket_id: ticket.id.clone(),
            from: patch.expected_state,
            to: ticket.state,
            actor: patch.timeline_event.actor.clone(),
            timestamp: now,
        });
    }

    async fn alert(&self, kind: AlertKind, ticket: &Ticket, now: DateTime<Utc>) {
        if !self.throttle.should_fire(kind, &ticket.responsible_party) {
            return;
        }
        let alert = Alert::new(kind, ticket.responsible_party.clone(), ticket.id.clone());
        if let Err(e) = self.notifier.notify(&alert).await {
            warn!(kind = %kind, party = %alert.party, error = %e, "Alert not delivered");
            return;
        }
        self.events.publish(TicketEvent::AlertRaised {
            ticket_id: ticket.id.clone(),
            party: ticket.responsible_party.clone(),
            kind,
            timestamp: now,
        });
    }

    async fn upload(&self, payload: PhotoPayload, name: &str) -> TrackerResult<String> {
        self.photos.upload(payload, name).await.map_err(|e| {
            warn!(name, error = %e, "Photo upload failed");
            TrackerError::upload_failed(name, e.to_string())
        })
    }

    async fn delete_photo(&self, url: &str) {
        if let Err(e) = self.photos.delete(url).await {
            warn!(url, error = %e, "Photo delete failed");
        }
    }
}
