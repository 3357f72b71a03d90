//! Storage row definitions
//!
//! Rows use the snake_case column names of the complaints table
//! (`ticket_id`, `assigned_supervisor`, `supervisor_deadline`, ...) and the
//! table's status strings. Conversion to and from the domain types happens
//! here and nowhere else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{StoreError, StoreResult};
use crate::ledger::{LedgerEntry, PenaltyKey};
use crate::ticket::{
    Actor, Deadlines, Evidence, Location, PartyId, Reporter, Ticket, TicketFlags, TicketId,
    TicketState, TimelineEvent,
};

/// Storage status string for a state
pub fn status_str(state: TicketState) -> &'static str {
    match state {
        TicketState::AwaitingAcceptance => "pending_acceptance",
        TicketState::AwaitingResolution => "pending_supervisor",
        TicketState::AwaitingReporterReview => "pending_approval",
        TicketState::EscalatedToAuthority => "pending_ao",
        TicketState::PendingQualityReview => "pending_ao_review",
        TicketState::ReportedToAuthority => "reported_to_ao",
        TicketState::EscalatedToVendor => "escalated_to_vendor",
        TicketState::AuthorityResolved => "ao_resolved",
        TicketState::Resolved => "resolved",
        TicketState::Closed => "closed",
        TicketState::ClosedOverdue => "closed_overdue",
    }
}

/// Parse a storage status string
pub fn parse_status(raw: &str) -> StoreResult<TicketState> {
    TicketState::ALL
        .iter()
        .copied()
        .find(|state| status_str(*state) == raw)
        .ok_or_else(|| StoreError::Deserialization(format!("unknown status '{}'", raw)))
}

/// One timeline entry as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineRow {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub by: String,
}

/// One row of the complaints table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRow {
    pub ticket_id: String,
    pub student_uid: String,
    pub student_name: String,
    pub reg_no: String,
    pub phone: String,
    /// `<block>[-<floor>]`
    pub block: String,
    pub issue_type: String,
    pub description: String,
    pub photo_url: Option<String>,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
    pub acceptance_deadline: Option<DateTime<Utc>>,
    pub supervisor_deadline: Option<DateTime<Utc>>,
    pub ao_deadline: Option<DateTime<Utc>>,
    pub assigned_supervisor: String,
    pub supervisor_photo: Option<String>,
    pub student_approved: bool,
    pub student_rating: Option<u8>,
    pub escalated: bool,
    pub auto_accepted: bool,
    #[serde(default)]
    pub supervisor_missed_point_awarded: bool,
    pub ao_missed_point_awarded: bool,
    pub accepted_at: Option<DateTime<Utc>>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_on_time: Option<bool>,
    pub ao_resolved_at: Option<DateTime<Utc>>,
    pub ao_resolution_photo: Option<String>,
    pub timeline: Vec<TimelineRow>,
}

impl TicketRow {
    pub fn from_ticket(ticket: &Ticket) -> Self {
        Self {
            ticket_id: ticket.id.to_string(),
            student_uid: ticket.reporter.uid.clone(),
            student_name: ticket.reporter.name.clone(),
            reg_no: ticket.reporter.registration_no.clone(),
            phone: ticket.reporter.phone.clone(),
            block: ticket.location.form_value(),
            issue_type: ticket.issue_category.clone(),
            description: ticket.description.clone(),
            photo_url: ticket.evidence.reporter_photo.clone(),
            status: status_str(ticket.state).to_string(),
            submitted_at: ticket.submitted_at,
            acceptance_deadline: ticket.deadlines.acceptance,
            supervisor_deadline: ticket.deadlines.resolution,
            ao_deadline: ticket.deadlines.authority,
            assigned_supervisor: ticket.responsible_party.to_string(),
            supervisor_photo: ticket.evidence.resolution_photo.clone(),
            student_approved: ticket.flags.reporter_approved,
            student_rating: ticket.rating,
            escalated: ticket.flags.escalated,
            auto_accepted: ticket.flags.auto_accepted,
            supervisor_missed_point_awarded: ticket.flags.resolution_penalty_charged,
            ao_missed_point_awarded: ticket.flags.final_penalty_charged,
            accepted_at: ticket.accepted_at,
            resolved_at: ticket.resolved_at,
            resolved_on_time: ticket.resolved_on_time,
            ao_resolved_at: ticket.authority_resolved_at,
            ao_resolution_photo: ticket.evidence.authority_photo.clone(),
            timeline: ticket
                .timeline
                .iter()
                .map(|e| TimelineRow {
                    action: e.description.clone(),
                    timestamp: e.timestamp,
                    by: e.actor.to_string(),
                })
                .collect(),
        }
    }

    pub fn into_ticket(self) -> StoreResult<Ticket> {
        let state = parse_status(&self.status)?;
        let location = Location::parse(&self.block).map_err(|e| {
            StoreError::Deserialization(format!("ticket {}: {}", self.ticket_id, e))
        })?;
        if !(1..=5).contains(&self.student_rating.unwrap_or(1)) {
            return Err(StoreError::Deserialization(format!(
                "ticket {}: rating out of range",
                self.ticket_id
            )));
        }

        Ok(Ticket {
            id: TicketId::new(self.ticket_id),
            issue_category: self.issue_type,
            description: self.description,
            location,
            reporter: Reporter {
                uid: self.student_uid,
                name: self.student_name,
                registration_no: self.reg_no,
                phone: self.phone,
            },
            responsible_party: PartyId::new(self.assigned_supervisor),
            state,
            deadlines: Deadlines {
                acceptance: self.acceptance_deadline,
                resolution: self.supervisor_deadline,
                authority: self.ao_deadline,
            },
            evidence: Evidence {
                reporter_photo: self.photo_url,
                resolution_photo: self.supervisor_photo,
                authority_photo: self.ao_resolution_photo,
            },
            rating: self.student_rating,
            resolved_on_time: self.resolved_on_time,
            flags: TicketFlags {
                auto_accepted: self.auto_accepted,
                escalated: self.escalated,
                resolution_penalty_charged: self.supervisor_missed_point_awarded,
                final_penalty_charged: self.ao_missed_point_awarded,
                reporter_approved: self.student_approved,
            },
            submitted_at: self.submitted_at,
            accepted_at: self.accepted_at,
            resolved_at: self.resolved_at,
            authority_resolved_at: self.ao_resolved_at,
            timeline: self
                .timeline
                .into_iter()
                .map(|row| TimelineEvent::new(row.action, row.timestamp, Actor::user(row.by)))
                .collect(),
        })
    }
}

/// One row of the supervisor stats table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub supervisor_uid: String,
    pub black_points: u32,
    pub total_resolved: u32,
    pub total_assigned: u32,
    pub total_missed: u32,
    pub total_escalated: u32,
    pub resolved_on_time: u32,
    pub avg_rating: f64,
    #[serde(default)]
    pub rated_count: u32,
    /// `<ticket>_<tier_key>` entries
    pub black_point_tickets: Vec<String>,
}

impl LedgerRow {
    pub fn from_entry(entry: &LedgerEntry) -> Self {
        Self {
            supervisor_uid: entry.party.to_string(),
            black_points: entry.penalty_count,
            total_resolved: entry.resolved_count,
            total_assigned: entry.assigned_count,
            total_missed: entry.missed_count,
            total_escalated: entry.escalated_count,
            resolved_on_time: entry.on_time_count,
            avg_rating: entry.avg_rating,
            rated_count: entry.rated_count,
            black_point_tickets: entry.penalized.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn into_entry(self) -> StoreResult<LedgerEntry> {
        let penalized = self
            .black_point_tickets
            .iter()
            .map(|raw| {
                PenaltyKey::parse(raw).ok_or_else(|| {
                    StoreError::Deserialization(format!("bad penalty key '{}'", raw))
                })
            })
            .collect::<StoreResult<_>>()?;

        Ok(LedgerEntry {
            party: PartyId::new(self.supervisor_uid),
            penalty_count: self.black_points,
            resolved_count: self.total_resolved,
            missed_count: self.total_missed,
            on_time_count: self.resolved_on_time,
            assigned_count: self.total_assigned,
            escalated_count: self.total_escalated,
            avg_rating: self.avg_rating,
            rated_count: self.rated_count,
            penalized,
        })
    }
}
