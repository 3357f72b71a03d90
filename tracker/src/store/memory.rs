//! In-process ticket store

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PatchOutcome, StoreError, StoreResult, TicketStore};
use crate::ticket::{Ticket, TicketId, TicketPatch};

/// Tickets held in a map behind an async lock.
///
/// `set_available(false)` makes every call fail with
/// [`StoreError::Unavailable`], which is how outages are exercised.
#[derive(Debug)]
pub struct MemoryTicketStore {
    tickets: RwLock<BTreeMap<TicketId, Ticket>>,
    available: AtomicBool,
}

impl Default for MemoryTicketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self {
            tickets: RwLock::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Seed the store with existing tickets
    pub fn with_tickets(tickets: impl IntoIterator<Item = Ticket>) -> Self {
        let map = tickets.into_iter().map(|t| (t.id.clone(), t)).collect();
        Self {
            tickets: RwLock::new(map),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check(&self) -> StoreResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        }
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn list_all(&self) -> StoreResult<Vec<Ticket>> {
        self.check()?;
        Ok(self.tickets.read().await.values().cloned().collect())
    }

    async fn get(&self, id: &TicketId) -> StoreResult<Option<Ticket>> {
        self.check()?;
        Ok(self.tickets.read().await.get(id).cloned())
    }

    async fn insert(&self, ticket: Ticket) -> StoreResult<()> {
        self.check()?;
        let mut tickets = self.tickets.write().await;
        if tickets.contains_key(&ticket.id) {
            return Err(StoreError::AlreadyExists(ticket.id.to_string()));
        }
        tickets.insert(ticket.id.clone(), ticket);
        Ok(())
    }

    async fn update(&self, patch: &TicketPatch) -> StoreResult<PatchOutcome> {
        self.check()?;
        let mut tickets = self.tickets.write().await;
        let Some(ticket) = tickets.get_mut(&patch.ticket_id) else {
            return Ok(PatchOutcome::Missing);
        };
        match patch.apply(ticket) {
            Ok(()) => Ok(PatchOutcome::Applied(Box::new(ticket.clone()))),
            Err(actual) => Ok(PatchOutcome::Stale { actual }),
        }
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::types::fixtures::open_ticket;
    use crate::ticket::{Actor, TicketState, TimelineEvent};
    use chrono::Utc;

    #[tokio::test]
    async fn test_insert_rejects_duplicate_id() {
        let store = MemoryTicketStore::new();
        let ticket = open_ticket("36", Utc::now());
        store.insert(ticket.clone()).await.unwrap();
        assert!(matches!(
            store.insert(ticket).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_update_is_compare_and_set() {
        let now = Utc::now();
        let ticket = open_ticket("36", now);
        let store = MemoryTicketStore::with_tickets([ticket.clone()]);
        let patch = TicketPatch::transition(
            &ticket,
            TicketState::AwaitingResolution,
            TimelineEvent::new("accepted", now, Actor::system()),
        );

        assert!(matches!(
            store.update(&patch).await.unwrap(),
            PatchOutcome::Applied(_)
        ));
        assert_eq!(
            store.update(&patch).await.unwrap(),
            PatchOutcome::Stale {
                actual: TicketState::AwaitingResolution
            }
        );
        let stored = store.get(&ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.timeline.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_ticket() {
        let now = Utc::now();
        let ticket = open_ticket("36", now);
        let store = MemoryTicketStore::new();
        let patch = TicketPatch::transition(
            &ticket,
            TicketState::AwaitingResolution,
            TimelineEvent::new("accepted", now, Actor::system()),
        );
        assert_eq!(store.update(&patch).await.unwrap(), PatchOutcome::Missing);
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_call() {
        let store = MemoryTicketStore::new();
        store.set_available(false);
        assert!(matches!(
            store.list_all().await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_available(true);
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
