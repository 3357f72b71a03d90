//! Event bus for ticket lifecycle events
//!
//! Pub/sub over a Tokio broadcast channel. Publishing with nobody listening
//! is fine; slow subscribers lag and skip instead of blocking the workflow.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::TicketEvent;
use crate::ticket::TicketId;

/// Channel capacity for broadcast
const CHANNEL_CAPACITY: usize = 256;

/// Shared reference to EventBus
pub type SharedEventBus = Arc<EventBus>;

/// Broadcast event bus
pub struct EventBus {
    sender: broadcast::Sender<TicketEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Create a shared reference to this event bus
    pub fn shared(self) -> SharedEventBus {
        Arc::new(self)
    }

    /// Publish to all subscribers; returns how many received it
    pub fn publish(&self, event: TicketEvent) -> usize {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(count) => {
                debug!(event_type, receivers = count, "Event published");
                count
            }
            Err(_) => {
                debug!(event_type, "Event published (no receivers)");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to the events matching `filter`
    pub fn subscribe_filtered(&self, filter: EventFilter) -> FilteredReceiver {
        FilteredReceiver {
            receiver: self.subscribe(),
            filter,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event filter for selective subscription
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub ticket_id: Option<TicketId>,
    pub event_types: Option<Vec<&'static str>>,
}

impl EventFilter {
    /// Matches everything
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket(mut self, ticket_id: TicketId) -> Self {
        self.ticket_id = Some(ticket_id);
        self
    }

    pub fn types(mut self, event_types: Vec<&'static str>) -> Self {
        self.event_types = Some(event_types);
        self
    }

    pub fn matches(&self, event: &TicketEvent) -> bool {
        if let Some(ref wanted) = self.ticket_id {
            if event.ticket_id() != Some(wanted) {
                return false;
            }
        }
        if let Some(ref types) = self.event_types {
            if !types.contains(&event.event_type()) {
                return false;
            }
        }
        true
    }
}

/// Receiver that only yields matching events
pub struct FilteredReceiver {
    receiver: broadcast::Receiver<TicketEvent>,
    filter: EventFilter,
}

impl FilteredReceiver {
    pub async fn recv(&mut self) -> Result<TicketEvent, broadcast::error::RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }
}
