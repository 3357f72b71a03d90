//! Ticket lifecycle events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::escalation::TierKey;
use crate::notify::AlertKind;
use crate::ticket::{Actor, PartyId, TicketId, TicketState};

/// Everything the workflow announces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TicketEvent {
    /// A complaint was filed
    TicketSubmitted {
        ticket_id: TicketId,
        party: PartyId,
        timestamp: DateTime<Utc>,
    },

    /// A patch was applied
    TransitionApplied {
        ticket_id: TicketId,
        from: TicketState,
        to: TicketState,
        actor: Actor,
        timestamp: DateTime<Utc>,
    },

    /// A penalty reached the ledger
    PenaltyCharged {
        ticket_id: TicketId,
        party: PartyId,
        tier_key: TierKey,
        penalty_count: u32,
        timestamp: DateTime<Utc>,
    },

    /// A local alert fired
    AlertRaised {
        ticket_id: TicketId,
        party: PartyId,
        kind: AlertKind,
        timestamp: DateTime<Utc>,
    },

    /// An engine pass finished
    EscalationPassCompleted {
        evaluated: usize,
        applied: usize,
        stale: usize,
        penalties: usize,
        degraded: bool,
        timestamp: DateTime<Utc>,
    },
}

impl TicketEvent {
    /// Snake_case event name
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TicketSubmitted { .. } => "ticket_submitted",
            Self::TransitionApplied { .. } => "transition_applied",
            Self::PenaltyCharged { .. } => "penalty_charged",
            Self::AlertRaised { .. } => "alert_raised",
            Self::EscalationPassCompleted { .. } => "escalation_pass_completed",
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::TicketSubmitted { timestamp, .. }
            | Self::TransitionApplied { timestamp, .. }
            | Self::PenaltyCharged { timestamp, .. }
            | Self::AlertRaised { timestamp, .. }
            | Self::EscalationPassCompleted { timestamp, .. } => *timestamp,
        }
    }

    /// Ticket this event concerns, if any
    pub fn ticket_id(&self) -> Option<&TicketId> {
        match self {
            Self::TicketSubmitted { ticket_id, .. }
            | Self::TransitionApplied { ticket_id, .. }
            | Self::PenaltyCharged { ticket_id, .. }
            | Self::AlertRaised { ticket_id, .. } => Some(ticket_id),
            Self::EscalationPassCompleted { .. } => None,
        }
    }
}
