//! Local alerts
//!
//! A responsible party gets one alert when one of their tickets is
//! auto-accepted and one when the authority summons them. The
//! [`AlertThrottle`] holds that to once per (condition, party) for the life
//! of the process; delivery failures are logged and never block a
//! transition.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ticket::{PartyId, TicketId};

/// Conditions that raise an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The engine accepted a ticket on the party's behalf
    AutoAccepted,
    /// The authority summoned the party over a low rating
    Summoned,
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoAccepted => write!(f, "auto_accepted"),
            Self::Summoned => write!(f, "summoned"),
        }
    }
}

/// One alert to deliver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub party: PartyId,
    pub ticket_id: TicketId,
    pub title: String,
    pub body: String,
}

impl Alert {
    pub fn new(kind: AlertKind, party: PartyId, ticket_id: TicketId) -> Self {
        let (title, body) = match kind {
            AlertKind::AutoAccepted => (
                "Complaint auto-accepted",
                format!(
                    "Ticket {} was accepted automatically. The 30-minute resolution timer is running.",
                    ticket_id
                ),
            ),
            AlertKind::Summoned => (
                "Summoned by authority",
                format!(
                    "Ticket {} received a low rating. Meet the authority office.",
                    ticket_id
                ),
            ),
        };
        Self {
            kind,
            party,
            ticket_id,
            title: title.to_string(),
            body,
        }
    }
}

/// Error type for alert delivery
#[derive(Debug, thiserror::Error)]
#[error("Alert delivery failed: {0}")]
pub struct NotifyError(pub String);

/// Shared notifier handle
pub type SharedNotifier = Arc<dyn Notifier>;

/// Alert sink
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError>;
}

/// Writes alerts to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &Alert) -> Result<(), NotifyError> {
        info!(
            kind = %alert.kind,
            party = %alert.party,
            ticket_id = %alert.ticket_id,
            "{}: {}",
            alert.title,
            alert.body
        );
        Ok(())
    }
}

/// Drops alerts; used when alerts are disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _alert: &Alert) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// At most one alert per (condition, party) per process
#[derive(Debug, Default)]
pub struct AlertThrottle {
    fired: Mutex<HashSet<(AlertKind, PartyId)>>,
}

impl AlertThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time a (kind, party) pair is seen
    pub fn should_fire(&self, kind: AlertKind, party: &PartyId) -> bool {
        match self.fired.lock() {
            Ok(mut fired) => fired.insert((kind, party.clone())),
            Err(poisoned) => poisoned.into_inner().insert((kind, party.clone())),
        }
    }
}
