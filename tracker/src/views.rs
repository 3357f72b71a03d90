//! Portal projections
//!
//! Each portal shows the same tickets bucketed differently. The buckets are
//! computed here from [`TicketState`] alone so every viewer agrees on where
//! a ticket sits; rendering is left to the caller.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::escalation::{format_countdown, remaining};
use crate::ticket::{PartyId, Ticket, TicketId, TicketState};

/// Human-readable status for a state
pub fn status_label(state: TicketState) -> &'static str {
    match state {
        TicketState::AwaitingAcceptance => "Awaiting Acceptance (10m)",
        TicketState::AwaitingResolution => "Resolution - Active (30m)",
        TicketState::AwaitingReporterReview => "Action Required - Approve",
        TicketState::EscalatedToAuthority => "Escalated - AO Office (30m)",
        TicketState::PendingQualityReview => "AO Review Pending",
        TicketState::ReportedToAuthority => "Supervisor Reported",
        TicketState::EscalatedToVendor => "Escalated to Vendor",
        TicketState::AuthorityResolved => "Resolved by AO Office",
        TicketState::Resolved => "Resolved",
        TicketState::Closed => "Closed",
        TicketState::ClosedOverdue => "Closed - Overdue",
    }
}

/// One ticket as a list row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketCard {
    pub ticket_id: TicketId,
    pub state: TicketState,
    pub label: &'static str,
    pub location: String,
    /// `mm:ss` until the active deadline, for timed states
    pub countdown: Option<String>,
}

impl TicketCard {
    pub fn new(ticket: &Ticket, now: DateTime<Utc>) -> Self {
        Self {
            ticket_id: ticket.id.clone(),
            state: ticket.state,
            label: status_label(ticket.state),
            location: ticket.location.to_string(),
            countdown: ticket
                .active_deadline()
                .map(|(_, due)| format_countdown(remaining(now, due))),
        }
    }
}

fn select<'a>(tickets: &[&'a Ticket], keep: impl Fn(TicketState) -> bool) -> Vec<&'a Ticket> {
    tickets.iter().copied().filter(|t| keep(t.state)).collect()
}

/// Supervisor portal, scoped to one party
#[derive(Debug, Clone, Serialize)]
pub struct SupervisorBoard<'a> {
    pub party: PartyId,
    pub unaccepted: Vec<&'a Ticket>,
    pub active: Vec<&'a Ticket>,
    pub awaiting_approval: Vec<&'a Ticket>,
    /// Missed windows now with the authority, or closed overdue
    pub authority_alerts: Vec<&'a Ticket>,
    pub history: Vec<&'a Ticket>,
}

impl<'a> SupervisorBoard<'a> {
    pub fn build(party: &PartyId, tickets: &'a [Ticket]) -> Self {
        use TicketState::*;
        let mine: Vec<&Ticket> = tickets
            .iter()
            .filter(|t| &t.responsible_party == party)
            .collect();
        Self {
            party: party.clone(),
            unaccepted: select(&mine, |s| s == AwaitingAcceptance),
            active: select(&mine, |s| s == AwaitingResolution),
            awaiting_approval: select(&mine, |s| s == AwaitingReporterReview),
            authority_alerts: select(&mine, |s| matches!(s, EscalatedToAuthority | ClosedOverdue)),
            history: select(&mine, |s| {
                matches!(
                    s,
                    Resolved | Closed | AuthorityResolved | PendingQualityReview | ReportedToAuthority
                )
            }),
        }
    }
}

/// Authority portal
#[derive(Debug, Clone, Serialize)]
pub struct AuthorityBoard<'a> {
    pub active: Vec<&'a Ticket>,
    pub resolved: Vec<&'a Ticket>,
    pub overdue: Vec<&'a Ticket>,
    pub reviews: Vec<&'a Ticket>,
    /// Tickets that ever missed a window
    pub missed_count: usize,
}

impl<'a> AuthorityBoard<'a> {
    pub fn build(tickets: &'a [Ticket]) -> Self {
        use TicketState::*;
        let all: Vec<&Ticket> = tickets.iter().collect();
        Self {
            active: select(&all, |s| s == EscalatedToAuthority),
            resolved: select(&all, |s| s.counts_as_resolved()),
            overdue: select(&all, |s| s == ClosedOverdue),
            reviews: select(&all, |s| s.is_quality_review()),
            missed_count: missed_count(tickets),
        }
    }
}

/// Vendor portal
#[derive(Debug, Clone, Serialize)]
pub struct VendorQueue<'a> {
    pub escalated: Vec<&'a Ticket>,
    pub missed_count: usize,
}

impl<'a> VendorQueue<'a> {
    pub fn build(tickets: &'a [Ticket]) -> Self {
        Self {
            escalated: tickets
                .iter()
                .filter(|t| t.state == TicketState::EscalatedToVendor)
                .collect(),
            missed_count: missed_count(tickets),
        }
    }
}

fn missed_count(tickets: &[Ticket]) -> usize {
    tickets
        .iter()
        .filter(|t| t.state == TicketState::ClosedOverdue || t.flags.escalated)
        .count()
}

/// Reporter portal, scoped to one reporter
#[derive(Debug, Clone, Serialize)]
pub struct ReporterSummary {
    pub resolved: usize,
    pub missed: usize,
    pub pending: usize,
    /// Resolution waiting for this reporter's rating
    pub needs_rating: Option<TicketId>,
    /// Newest first
    pub cards: Vec<TicketCard>,
}

impl ReporterSummary {
    pub fn build(reporter_uid: &str, tickets: &[Ticket], now: DateTime<Utc>) -> Self {
        use TicketState::*;
        let mut mine: Vec<&Ticket> = tickets
            .iter()
            .filter(|t| t.reporter.uid == reporter_uid)
            .collect();
        mine.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

        Self {
            resolved: select(&mine, |s| s.counts_as_resolved()).len(),
            missed: select(&mine, |s| matches!(s, EscalatedToAuthority | ClosedOverdue)).len(),
            pending: select(&mine, |s| {
                matches!(s, AwaitingAcceptance | AwaitingResolution | AwaitingReporterReview)
            })
            .len(),
            needs_rating: mine
                .iter()
                .find(|t| t.state == AwaitingReporterReview)
                .map(|t| t.id.clone()),
            cards: mine.iter().map(|t| TicketCard::new(t, now)).collect(),
        }
    }
}

/// Administrator totals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub total: usize,
    /// Not yet resolved (overdue closures count as open)
    pub active: usize,
}

impl Overview {
    pub fn build(tickets: &[Ticket]) -> Self {
        Self {
            total: tickets.len(),
            active: tickets
                .iter()
                .filter(|t| !t.state.counts_as_resolved())
                .count(),
        }
    }
}
