//! Ticket lifecycle states
//!
//! One closed enum consumed everywhere through exhaustive matching. Portal
//! views, the engine and the storage mapping all interpret this type; none
//! of them keeps its own notion of status strings.

use serde::{Deserialize, Serialize};

use crate::escalation::tier::Tier;

/// Every state a ticket can occupy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    /// Initial state; responsible party has 10 minutes to accept
    AwaitingAcceptance,
    /// Accepted (or auto-accepted); 30-minute resolution window running
    AwaitingResolution,
    /// Resolution evidence submitted; reporter must rate or reject
    AwaitingReporterReview,
    /// Resolution window missed; authority has 30 minutes
    EscalatedToAuthority,
    /// Low rating forwarded to the authority for review
    PendingQualityReview,
    /// Authority summoned the responsible party
    ReportedToAuthority,
    /// Authority handed the dispute to the vendor
    EscalatedToVendor,
    /// Authority resolved an escalated ticket
    AuthorityResolved,
    /// Closed successfully
    Resolved,
    /// Administratively closed
    Closed,
    /// Authority window missed; closed with a final penalty
    ClosedOverdue,
}

impl TicketState {
    /// All states, in lifecycle order
    pub const ALL: [TicketState; 11] = [
        Self::AwaitingAcceptance,
        Self::AwaitingResolution,
        Self::AwaitingReporterReview,
        Self::EscalatedToAuthority,
        Self::PendingQualityReview,
        Self::ReportedToAuthority,
        Self::EscalatedToVendor,
        Self::AuthorityResolved,
        Self::Resolved,
        Self::Closed,
        Self::ClosedOverdue,
    ];

    /// Stable snake_case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingAcceptance => "awaiting_acceptance",
            Self::AwaitingResolution => "awaiting_resolution",
            Self::AwaitingReporterReview => "awaiting_reporter_review",
            Self::EscalatedToAuthority => "escalated_to_authority",
            Self::PendingQualityReview => "pending_quality_review",
            Self::ReportedToAuthority => "reported_to_authority",
            Self::EscalatedToVendor => "escalated_to_vendor",
            Self::AuthorityResolved => "authority_resolved",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::ClosedOverdue => "closed_overdue",
        }
    }

    /// The timed tier whose deadline is active in this state, if any
    pub fn timed_tier(&self) -> Option<Tier> {
        match self {
            Self::AwaitingAcceptance => Some(Tier::Acceptance),
            Self::AwaitingResolution => Some(Tier::Resolution),
            Self::EscalatedToAuthority => Some(Tier::AuthorityOvertime),
            Self::AwaitingReporterReview
            | Self::PendingQualityReview
            | Self::ReportedToAuthority
            | Self::EscalatedToVendor
            | Self::AuthorityResolved
            | Self::Resolved
            | Self::Closed
            | Self::ClosedOverdue => None,
        }
    }

    /// No further automatic or manual transitions leave a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::AuthorityResolved | Self::Resolved | Self::Closed | Self::ClosedOverdue
        )
    }

    /// Whether aggregates count the ticket as resolved
    pub fn counts_as_resolved(&self) -> bool {
        matches!(self, Self::AuthorityResolved | Self::Resolved | Self::Closed)
    }

    /// States in the authority's quality-review bucket
    pub fn is_quality_review(&self) -> bool {
        matches!(self, Self::PendingQualityReview | Self::ReportedToAuthority)
    }
}

impl std::fmt::Display for TicketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| format!("unknown ticket state '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_states_map_to_tiers() {
        assert_eq!(
            TicketState::AwaitingAcceptance.timed_tier(),
            Some(Tier::Acceptance)
        );
        assert_eq!(
            TicketState::AwaitingResolution.timed_tier(),
            Some(Tier::Resolution)
        );
        assert_eq!(
            TicketState::EscalatedToAuthority.timed_tier(),
            Some(Tier::AuthorityOvertime)
        );
        let untimed = TicketState::ALL
            .iter()
            .filter(|s| s.timed_tier().is_none())
            .count();
        assert_eq!(untimed, 8);
    }

    #[test]
    fn test_terminal_states_have_no_deadline() {
        for state in TicketState::ALL {
            if state.is_terminal() {
                assert!(state.timed_tier().is_none(), "{state} is terminal but timed");
            }
        }
    }

    #[test]
    fn test_from_str_accepts_display_output() {
        for state in TicketState::ALL {
            let parsed: TicketState = state.to_string().parse().unwrap();
            assert_eq!(parsed, state);
        }
        assert!("pending_ao".parse::<TicketState>().is_err());
    }

    #[test]
    fn test_closed_overdue_is_not_resolved() {
        assert!(TicketState::ClosedOverdue.is_terminal());
        assert!(!TicketState::ClosedOverdue.counts_as_resolved());
        assert!(TicketState::AuthorityResolved.counts_as_resolved());
    }
}
