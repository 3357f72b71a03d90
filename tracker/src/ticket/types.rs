//! Core ticket records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::Location;
use super::state::TicketState;
use crate::escalation::tier::Tier;

/// Characters used in generated ticket identifiers (no 0/O/1/I)
const TICKET_ID_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Prefix of generated ticket identifiers
pub const TICKET_ID_PREFIX: &str = "HYG-";

/// Unique, immutable ticket identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh identifier such as `HYG-7KQ2M9XD`
    pub fn generate() -> Self {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        let suffix: String = bytes
            .iter()
            .take(8)
            .map(|b| TICKET_ID_ALPHABET[*b as usize % TICKET_ID_ALPHABET.len()] as char)
            .collect();
        Self(format!("{}{}", TICKET_ID_PREFIX, suffix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TicketId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Responsible-party identifier (a block supervisor, e.g. `SUP-36`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(String);

impl PartyId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PartyId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who caused a timeline entry: `system` or a user id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Actor(String);

impl Actor {
    pub const SYSTEM: &'static str = "system";

    /// The escalation engine
    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    pub fn user(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn is_system(&self) -> bool {
        self.0 == Self::SYSTEM
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&PartyId> for Actor {
    fn from(party: &PartyId) -> Self {
        Self(party.as_str().to_string())
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One append-only history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub actor: Actor,
}

impl TimelineEvent {
    pub fn new(description: impl Into<String>, timestamp: DateTime<Utc>, actor: Actor) -> Self {
        Self {
            description: description.into(),
            timestamp,
            actor,
        }
    }
}

/// Reporter identity and contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reporter {
    pub uid: String,
    pub name: String,
    pub registration_no: String,
    pub phone: String,
}

/// Deadline timestamps per tier; only the one matching the state is active
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadlines {
    pub acceptance: Option<DateTime<Utc>>,
    pub resolution: Option<DateTime<Utc>>,
    pub authority: Option<DateTime<Utc>>,
}

impl Deadlines {
    pub fn for_tier(&self, tier: Tier) -> Option<DateTime<Utc>> {
        match tier {
            Tier::Acceptance => self.acceptance,
            Tier::Resolution => self.resolution,
            Tier::AuthorityOvertime => self.authority,
        }
    }
}

/// Photo references; each may be purged independently
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    pub reporter_photo: Option<String>,
    pub resolution_photo: Option<String>,
    pub authority_photo: Option<String>,
}

impl Evidence {
    /// All photo URLs currently referenced
    pub fn urls(&self) -> Vec<&str> {
        [
            self.reporter_photo.as_deref(),
            self.resolution_photo.as_deref(),
            self.authority_photo.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Outcome flags; the `*_penalty_charged` pair guards against double charging
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketFlags {
    /// Acceptance window lapsed and the engine accepted on the party's behalf
    pub auto_accepted: bool,
    /// Resolution window missed
    pub escalated: bool,
    pub resolution_penalty_charged: bool,
    pub final_penalty_charged: bool,
    /// Reporter submitted a rating
    pub reporter_approved: bool,
}

/// Input for filing a new complaint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTicket {
    pub issue_category: String,
    pub description: String,
    pub location: Location,
    pub reporter: Reporter,
}

/// A complaint and its full lifecycle record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub issue_category: String,
    pub description: String,
    pub location: Location,
    pub reporter: Reporter,
    pub responsible_party: PartyId,
    pub state: TicketState,
    pub deadlines: Deadlines,
    pub evidence: Evidence,
    pub rating: Option<u8>,
    pub resolved_on_time: Option<bool>,
    pub flags: TicketFlags,
    pub submitted_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub authority_resolved_at: Option<DateTime<Utc>>,
    pub timeline: Vec<TimelineEvent>,
}

impl Ticket {
    /// Register a new complaint in `AwaitingAcceptance`.
    ///
    /// The responsible party is derived from the location here and never
    /// changes afterwards.
    pub fn open(new: NewTicket, reporter_photo: Option<String>, now: DateTime<Utc>) -> Self {
        let actor = Actor::user(new.reporter.uid.clone());
        let responsible_party = new.location.responsible_party();
        Self {
            id: TicketId::generate(),
            issue_category: new.issue_category,
            description: new.description,
            location: new.location,
            reporter: new.reporter,
            responsible_party,
            state: TicketState::AwaitingAcceptance,
            deadlines: Deadlines {
                acceptance: Some(Tier::Acceptance.deadline_from(now)),
                ..Default::default()
            },
            evidence: Evidence {
                reporter_photo,
                ..Default::default()
            },
            rating: None,
            resolved_on_time: None,
            flags: TicketFlags::default(),
            submitted_at: now,
            accepted_at: None,
            resolved_at: None,
            authority_resolved_at: None,
            timeline: vec![TimelineEvent::new(
                "Complaint registered, awaiting supervisor acceptance",
                now,
                actor,
            )],
        }
    }

    /// The deadline tied to the current state, if the state is timed
    pub fn active_deadline(&self) -> Option<(Tier, DateTime<Utc>)> {
        let tier = self.state.timed_tier()?;
        self.deadlines.for_tier(tier).map(|due| (tier, due))
    }

    /// Whether the active deadline has strictly passed
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.active_deadline().is_some_and(|(_, due)| now > due)
    }

    /// Most recent timeline entry
    pub fn last_event(&self) -> Option<&TimelineEvent> {
        self.timeline.last()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 21, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_generated_ids_use_prefix_and_alphabet() {
        let id = TicketId::generate();
        let suffix = id.as_str().strip_prefix(TICKET_ID_PREFIX).unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.bytes().all(|b| TICKET_ID_ALPHABET.contains(&b)));
        assert_ne!(TicketId::generate(), id);
    }

    #[test]
    fn test_open_sets_acceptance_deadline_and_party() {
        let ticket = open_ticket("36", t0());
        assert_eq!(ticket.state, TicketState::AwaitingAcceptance);
        assert_eq!(ticket.responsible_party.as_str(), "SUP-36");
        assert_eq!(
            ticket.active_deadline(),
            Some((Tier::Acceptance, t0() + Duration::minutes(10)))
        );
        assert_eq!(
            ticket.deadlines.acceptance,
            Some(Tier::Acceptance.deadline_from(t0()))
        );
        assert_eq!(ticket.timeline.len(), 1);
        assert_eq!(ticket.timeline[0].actor.as_str(), "123");
    }

    #[test]
    fn test_overdue_is_strict() {
        let ticket = open_ticket("36", t0());
        let due = t0() + Duration::minutes(10);
        assert!(!ticket.is_overdue(due));
        assert!(ticket.is_overdue(due + Duration::seconds(1)));
    }

    #[test]
    fn test_evidence_urls_skip_cleared_slots() {
        let evidence = Evidence {
            reporter_photo: Some("a".to_string()),
            resolution_photo: None,
            authority_photo: Some("c".to_string()),
        };
        assert_eq!(evidence.urls(), vec!["a", "c"]);
    }
}
