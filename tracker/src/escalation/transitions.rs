//! User-initiated transitions
//!
//! Each function checks the ticket's current state, builds the patch for the
//! transition and lists the side effects the workflow must carry out once
//! the patch is applied. Nothing here performs I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};
use crate::escalation::engine::PenaltyEvent;
use crate::escalation::tier::{Tier, TierKey};
use crate::ticket::{Actor, PartyId, Ticket, TicketPatch, TicketState, TimelineEvent};

/// Lowest rating that closes a ticket without authority review
pub const SATISFIED_RATING: u8 = 4;

/// Work that follows a successfully applied patch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEffect {
    /// Bump the party's resolved (and possibly on-time) counters
    RecordResolution { party: PartyId, on_time: bool },
    /// Recompute the party's rating average
    RecordRating { party: PartyId, rating: u8 },
    /// Charge a deduplicated penalty
    ChargePenalty(PenaltyEvent),
    /// Delete these photos from the photo store
    PurgePhotos { urls: Vec<String> },
}

/// A validated manual transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub patch: TicketPatch,
    pub effects: Vec<SideEffect>,
}

impl Transition {
    fn new(patch: TicketPatch) -> Self {
        Self {
            patch,
            effects: Vec::new(),
        }
    }

    fn with_effect(mut self, effect: SideEffect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Vendor's final call on a quality dispute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorDecision {
    /// Accept the work and close
    Clear,
    /// Close with a warning penalty for the responsible party
    Warn,
}

fn require(ticket: &Ticket, action: &'static str, allowed: &[TicketState]) -> TrackerResult<()> {
    if allowed.contains(&ticket.state) {
        Ok(())
    } else {
        Err(TrackerError::invalid_transition(&ticket.id, action, ticket.state))
    }
}

/// Responsible party accepts; starts the resolution window
pub fn accept(ticket: &Ticket, now: DateTime<Utc>, actor: Actor) -> TrackerResult<Transition> {
    require(ticket, "accept", &[TicketState::AwaitingAcceptance])?;

    let mut patch = TicketPatch::transition(
        ticket,
        TicketState::AwaitingResolution,
        TimelineEvent::new(
            "Complaint accepted by supervisor. 30-minute resolution timer started.",
            now,
            actor,
        ),
    );
    patch.accepted_at = Some(now);
    patch.resolution_deadline = Some(Tier::Resolution.deadline_from(now));
    Ok(Transition::new(patch))
}

/// Responsible party submits resolution evidence
pub fn submit_resolution(
    ticket: &Ticket,
    now: DateTime<Utc>,
    actor: Actor,
    photo_url: String,
) -> TrackerResult<Transition> {
    require(ticket, "resolve", &[TicketState::AwaitingResolution])?;

    let on_time = ticket.deadlines.resolution.is_some_and(|due| now <= due);
    let mut patch = TicketPatch::transition(
        ticket,
        TicketState::AwaitingReporterReview,
        TimelineEvent::new(
            "Supervisor marked resolved, pending reporter review",
            now,
            actor,
        ),
    );
    patch.resolution_photo = Some(Some(photo_url));
    patch.resolved_at = Some(Some(now));
    patch.resolved_on_time = Some(Some(on_time));

    Ok(Transition::new(patch).with_effect(SideEffect::RecordResolution {
        party: ticket.responsible_party.clone(),
        on_time,
    }))
}

/// Reporter rates the resolution; low ratings go to the authority
pub fn rate(
    ticket: &Ticket,
    now: DateTime<Utc>,
    actor: Actor,
    rating: u8,
) -> TrackerResult<Transition> {
    if !(1..=5).contains(&rating) {
        return Err(TrackerError::invalid_rating(
            &ticket.id,
            format!("{} is outside 1..=5", rating),
        ));
    }
    if let Some(existing) = ticket.rating {
        return Err(TrackerError::invalid_rating(
            &ticket.id,
            format!("already rated {}", existing),
        ));
    }
    require(ticket, "rate", &[TicketState::AwaitingReporterReview])?;

    let (to, description) = if rating >= SATISFIED_RATING {
        (
            TicketState::Resolved,
            format!("Resolution approved by reporter. Rated {}/5", rating),
        )
    } else {
        (
            TicketState::PendingQualityReview,
            format!(
                "Low rating review: forwarded to authority office (rated {}/5)",
                rating
            ),
        )
    };

    let mut patch = TicketPatch::transition(ticket, to, TimelineEvent::new(description, now, actor));
    patch.rating = Some(rating);
    patch.reporter_approved = Some(true);

    Ok(Transition::new(patch).with_effect(SideEffect::RecordRating {
        party: ticket.responsible_party.clone(),
        rating,
    }))
}

/// Reporter rejects the resolution; reopens with a fresh window
pub fn reject(ticket: &Ticket, now: DateTime<Utc>, actor: Actor) -> TrackerResult<Transition> {
    require(ticket, "reject", &[TicketState::AwaitingReporterReview])?;

    let mut patch = TicketPatch::transition(
        ticket,
        TicketState::AwaitingResolution,
        TimelineEvent::new("Reporter rejected resolution, reopened", now, actor),
    );
    patch.resolution_deadline = Some(Tier::Resolution.deadline_from(now));
    patch.resolution_photo = Some(None);
    patch.resolved_at = Some(None);
    patch.resolved_on_time = Some(None);
    Ok(Transition::new(patch))
}

/// Authority resolves an escalated ticket with its own evidence
pub fn authority_resolve(
    ticket: &Ticket,
    now: DateTime<Utc>,
    actor: Actor,
    photo_url: String,
) -> TrackerResult<Transition> {
    require(ticket, "resolve", &[TicketState::EscalatedToAuthority])?;

    let mut patch = TicketPatch::transition(
        ticket,
        TicketState::AuthorityResolved,
        TimelineEvent::new("Authority office marked resolved", now, actor),
    );
    patch.authority_photo = Some(Some(photo_url));
    patch.authority_resolved_at = Some(now);
    Ok(Transition::new(patch))
}

/// Authority summons the responsible party over a low rating
pub fn summon(ticket: &Ticket, now: DateTime<Utc>, actor: Actor) -> TrackerResult<Transition> {
    require(ticket, "summon", &[TicketState::PendingQualityReview])?;

    let patch = TicketPatch::transition(
        ticket,
        TicketState::ReportedToAuthority,
        TimelineEvent::new(
            "Authority summoned supervisor: low quality work, meeting required",
            now,
            actor,
        ),
    );
    Ok(Transition::new(patch))
}

/// Authority clears a review without dispute; evidence is purged
pub fn clear_review(ticket: &Ticket, now: DateTime<Utc>, actor: Actor) -> TrackerResult<Transition> {
    require(
        ticket,
        "clear",
        &[
            TicketState::PendingQualityReview,
            TicketState::ReportedToAuthority,
        ],
    )?;

    let patch = TicketPatch::transition(
        ticket,
        TicketState::Resolved,
        TimelineEvent::new("Authority cleared review, photos deleted", now, actor),
    )
    .purge_evidence();
    Ok(with_purge(ticket, Transition::new(patch)))
}

/// Authority hands a disputed review to the vendor
pub fn escalate_to_vendor(
    ticket: &Ticket,
    now: DateTime<Utc>,
    actor: Actor,
) -> TrackerResult<Transition> {
    require(
        ticket,
        "escalate",
        &[
            TicketState::PendingQualityReview,
            TicketState::ReportedToAuthority,
        ],
    )?;

    let patch = TicketPatch::transition(
        ticket,
        TicketState::EscalatedToVendor,
        TimelineEvent::new("Authority reported to vendor: quality dispute", now, actor),
    );
    Ok(Transition::new(patch))
}

/// Vendor closes a dispute, optionally with a warning penalty
pub fn vendor_decide(
    ticket: &Ticket,
    now: DateTime<Utc>,
    actor: Actor,
    decision: VendorDecision,
) -> TrackerResult<Transition> {
    require(ticket, "decide", &[TicketState::EscalatedToVendor])?;

    let description = match decision {
        VendorDecision::Clear => "Vendor final decision: accepted. Case closed.",
        VendorDecision::Warn => "Vendor final decision: warning issued. Case closed.",
    };
    let patch = TicketPatch::transition(
        ticket,
        TicketState::Resolved,
        TimelineEvent::new(description, now, actor),
    )
    .purge_evidence();

    let mut transition = with_purge(ticket, Transition::new(patch));
    if decision == VendorDecision::Warn {
        transition = transition.with_effect(SideEffect::ChargePenalty(PenaltyEvent::new(
            ticket,
            TierKey::VendorWarning,
        )));
    }
    Ok(transition)
}

fn with_purge(ticket: &Ticket, transition: Transition) -> Transition {
    let urls: Vec<String> = ticket.evidence.urls().into_iter().map(String::from).collect();
    if urls.is_empty() {
        transition
    } else {
        transition.with_effect(SideEffect::PurgePhotos { urls })
    }
}
