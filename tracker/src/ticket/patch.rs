//! Partial ticket updates
//!
//! A [`TicketPatch`] is one state transition: the state it expects to find,
//! the fields it changes and exactly one timeline entry. Stores apply a
//! patch only if the ticket is still in `expected_state`, which is what
//! makes concurrent engine passes safe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::TicketState;
use super::types::{Ticket, TicketId, TimelineEvent};

/// Field updates for a single transition.
///
/// `Option<Option<_>>` fields distinguish "leave alone" (`None`) from
/// "clear" (`Some(None)`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketPatch {
    pub ticket_id: TicketId,
    pub expected_state: TicketState,
    pub state: Option<TicketState>,

    pub acceptance_deadline: Option<DateTime<Utc>>,
    pub resolution_deadline: Option<DateTime<Utc>>,
    pub authority_deadline: Option<DateTime<Utc>>,

    pub reporter_photo: Option<Option<String>>,
    pub resolution_photo: Option<Option<String>>,
    pub authority_photo: Option<Option<String>>,

    pub rating: Option<u8>,
    pub resolved_on_time: Option<Option<bool>>,

    pub auto_accepted: Option<bool>,
    pub escalated: Option<bool>,
    pub resolution_penalty_charged: Option<bool>,
    pub final_penalty_charged: Option<bool>,
    pub reporter_approved: Option<bool>,

    pub accepted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<Option<DateTime<Utc>>>,
    pub authority_resolved_at: Option<DateTime<Utc>>,

    pub timeline_event: TimelineEvent,
}

impl TicketPatch {
    /// Start a patch that moves `ticket` from its current state to `to`
    pub fn transition(ticket: &Ticket, to: TicketState, event: TimelineEvent) -> Self {
        Self {
            ticket_id: ticket.id.clone(),
            expected_state: ticket.state,
            state: Some(to),
            acceptance_deadline: None,
            resolution_deadline: None,
            authority_deadline: None,
            reporter_photo: None,
            resolution_photo: None,
            authority_photo: None,
            rating: None,
            resolved_on_time: None,
            auto_accepted: None,
            escalated: None,
            resolution_penalty_charged: None,
            final_penalty_charged: None,
            reporter_approved: None,
            accepted_at: None,
            resolved_at: None,
            authority_resolved_at: None,
            timeline_event: event,
        }
    }

    /// Target state of this patch
    pub fn target_state(&self) -> TicketState {
        self.state.unwrap_or(self.expected_state)
    }

    /// Clear every photo reference
    pub fn purge_evidence(mut self) -> Self {
        self.reporter_photo = Some(None);
        self.resolution_photo = Some(None);
        self.authority_photo = Some(None);
        self
    }

    /// Apply to `ticket` if it is still in the expected state.
    ///
    /// Returns the actual state on a precondition mismatch and leaves the
    /// ticket untouched.
    pub fn apply(&self, ticket: &mut Ticket) -> Result<(), TicketState> {
        if ticket.id != self.ticket_id || ticket.state != self.expected_state {
            return Err(ticket.state);
        }

        if let Some(state) = self.state {
            ticket.state = state;
        }

        set(&mut ticket.deadlines.acceptance, self.acceptance_deadline);
        set(&mut ticket.deadlines.resolution, self.resolution_deadline);
        set(&mut ticket.deadlines.authority, self.authority_deadline);

        replace(&mut ticket.evidence.reporter_photo, &self.reporter_photo);
        replace(&mut ticket.evidence.resolution_photo, &self.resolution_photo);
        replace(&mut ticket.evidence.authority_photo, &self.authority_photo);

        // set-once
        if ticket.rating.is_none() {
            set(&mut ticket.rating, self.rating);
        }
        replace(&mut ticket.resolved_on_time, &self.resolved_on_time);

        let flags = &mut ticket.flags;
        flag(&mut flags.auto_accepted, self.auto_accepted);
        flag(&mut flags.escalated, self.escalated);
        flag(
            &mut flags.resolution_penalty_charged,
            self.resolution_penalty_charged,
        );
        flag(&mut flags.final_penalty_charged, self.final_penalty_charged);
        flag(&mut flags.reporter_approved, self.reporter_approved);

        set(&mut ticket.accepted_at, self.accepted_at);
        if let Some(resolved_at) = self.resolved_at {
            ticket.resolved_at = resolved_at;
        }
        set(&mut ticket.authority_resolved_at, self.authority_resolved_at);

        ticket.timeline.push(self.timeline_event.clone());
        Ok(())
    }
}

fn set<T: Copy>(slot: &mut Option<T>, value: Option<T>) {
    if let Some(v) = value {
        *slot = Some(v);
    }
}

fn replace<T: Clone>(slot: &mut Option<T>, value: &Option<Option<T>>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

fn flag(slot: &mut bool, value: Option<bool>) {
    if let Some(v) = value {
        *slot = v;
    }
}
