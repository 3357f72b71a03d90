//! Escalation engine: deterministic timer-driven transitions
//!
//! Consumes a snapshot of tickets and the current instant and produces the
//! transitions whose deadlines have lapsed. The engine never touches a
//! store; the workflow applies its output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::escalation::tier::{Tier, TierKey};
use crate::ticket::{Actor, PartyId, Ticket, TicketId, TicketPatch, TicketState, TimelineEvent};

/// A penalty the ledger should record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PenaltyEvent {
    pub party: PartyId,
    pub ticket_id: TicketId,
    pub tier_key: TierKey,
}

impl PenaltyEvent {
    pub fn new(ticket: &Ticket, tier_key: TierKey) -> Self {
        Self {
            party: ticket.responsible_party.clone(),
            ticket_id: ticket.id.clone(),
            tier_key,
        }
    }
}

/// One lapsed deadline and what it causes.
///
/// The penalty is only charged if the patch is applied; the patch itself
/// sets the tier's guard flag so a later pass cannot charge again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedTransition {
    pub tier: Tier,
    pub patch: TicketPatch,
    pub penalty: Option<PenaltyEvent>,
}

/// Everything one engine pass decided
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EscalationOutcome {
    pub evaluated_at: Option<DateTime<Utc>>,
    pub tickets_evaluated: usize,
    pub transitions: Vec<TimedTransition>,
}

impl EscalationOutcome {
    /// Patches to apply, in ticket order
    pub fn patches(&self) -> impl Iterator<Item = &TicketPatch> {
        self.transitions.iter().map(|t| &t.patch)
    }

    /// Penalties to charge if their patches apply
    pub fn penalties(&self) -> impl Iterator<Item = &PenaltyEvent> {
        self.transitions.iter().filter_map(|t| t.penalty.as_ref())
    }

    /// Number of transitions for a tier
    pub fn count_for(&self, tier: Tier) -> usize {
        self.transitions.iter().filter(|t| t.tier == tier).count()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Get a summary for logging
    pub fn summary(&self) -> String {
        format!(
            "evaluated={} auto_accepted={} escalated={} closed_overdue={} penalties={}",
            self.tickets_evaluated,
            self.count_for(Tier::Acceptance),
            self.count_for(Tier::Resolution),
            self.count_for(Tier::AuthorityOvertime),
            self.penalties().count(),
        )
    }
}

/// Pure evaluation over a ticket snapshot
#[derive(Debug, Clone, Default)]
pub struct EscalationEngine;

impl EscalationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate every ticket once.
    ///
    /// A ticket advances at most one tier per pass even if it is overdue at
    /// several; the next pass picks up the rest.
    pub fn evaluate(&self, now: DateTime<Utc>, tickets: &[Ticket]) -> EscalationOutcome {
        let transitions = tickets
            .iter()
            .filter_map(|ticket| self.evaluate_ticket(now, ticket))
            .collect();

        EscalationOutcome {
            evaluated_at: Some(now),
            tickets_evaluated: tickets.len(),
            transitions,
        }
    }

    /// Decide the timer-driven transition for a single ticket, if any
    pub fn evaluate_ticket(&self, now: DateTime<Utc>, ticket: &Ticket) -> Option<TimedTransition> {
        let (tier, _) = ticket.active_deadline()?;
        if !ticket.is_overdue(now) {
            return None;
        }
        match tier {
            Tier::Acceptance => Some(self.auto_accept(now, ticket)),
            Tier::Resolution => Some(self.escalate_to_authority(now, ticket)),
            Tier::AuthorityOvertime => self.close_overdue(now, ticket),
        }
    }

    /// Acceptance window lapsed: accept on the party's behalf, no penalty
    fn auto_accept(&self, now: DateTime<Utc>, ticket: &Ticket) -> TimedTransition {
        let mut patch = TicketPatch::transition(
            ticket,
            TicketState::AwaitingResolution,
            TimelineEvent::new(
                "System auto-accepted: supervisor did not respond within 10 minutes. \
                 Resolution timer started.",
                now,
                Actor::system(),
            ),
        );
        patch.auto_accepted = Some(true);
        patch.accepted_at = Some(now);
        patch.resolution_deadline = Some(Tier::Resolution.deadline_from(now));

        TimedTransition {
            tier: Tier::Acceptance,
            patch,
            penalty: None,
        }
    }

    /// Resolution window lapsed: hand over to the authority, first penalty
    fn escalate_to_authority(&self, now: DateTime<Utc>, ticket: &Ticket) -> TimedTransition {
        // A reopened ticket can miss the window a second time; it escalates
        // again but is not charged twice.
        let already_charged = ticket.flags.resolution_penalty_charged;
        let description = if already_charged {
            "Escalated to authority: supervisor missed the 30-minute resolution window \
             (penalty already charged for this ticket)"
        } else {
            "Escalated to authority: supervisor missed the 30-minute resolution window \
             (1 penalty point)"
        };

        let mut patch = TicketPatch::transition(
            ticket,
            TicketState::EscalatedToAuthority,
            TimelineEvent::new(description, now, Actor::system()),
        );
        patch.escalated = Some(true);
        patch.resolution_penalty_charged = Some(true);
        patch.authority_deadline = Some(Tier::AuthorityOvertime.deadline_from(now));

        TimedTransition {
            tier: Tier::Resolution,
            patch,
            penalty: Tier::Resolution
                .penalty_key()
                .filter(|_| !already_charged)
                .map(|key| PenaltyEvent::new(ticket, key)),
        }
    }

    /// Authority window lapsed: close as overdue, final penalty
    fn close_overdue(&self, now: DateTime<Utc>, ticket: &Ticket) -> Option<TimedTransition> {
        if ticket.flags.final_penalty_charged {
            return None;
        }

        let mut patch = TicketPatch::transition(
            ticket,
            TicketState::ClosedOverdue,
            TimelineEvent::new(
                "System closed: authority grace period of 30 minutes missed (1 more penalty point)",
                now,
                Actor::system(),
            ),
        );
        patch.final_penalty_charged = Some(true);

        Some(TimedTransition {
            tier: Tier::AuthorityOvertime,
            patch,
            penalty: Tier::AuthorityOvertime
                .penalty_key()
                .map(|key| PenaltyEvent::new(ticket, key)),
        })
    }
}
