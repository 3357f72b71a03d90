//! Snapshot fallback for ticket reads

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::warn;

use super::{PatchOutcome, SharedTicketStore, StoreResult, TicketStore};
use crate::clock::SharedClock;
use crate::resilience::DegradedResponse;
use crate::ticket::{Ticket, TicketId, TicketPatch};

struct Snapshot {
    tickets: Vec<Ticket>,
    taken_at: DateTime<Utc>,
}

/// Wraps a store and remembers the last successful full read.
///
/// Writes always go to the inner store; a failed write is never hidden.
pub struct CachedTicketStore {
    inner: SharedTicketStore,
    clock: SharedClock,
    snapshot: RwLock<Option<Snapshot>>,
}

impl CachedTicketStore {
    pub fn new(inner: SharedTicketStore, clock: SharedClock) -> Self {
        Self {
            inner,
            clock,
            snapshot: RwLock::new(None),
        }
    }

    /// Read every ticket, falling back to the last snapshot on failure
    pub async fn read_all(&self) -> DegradedResponse<Vec<Ticket>> {
        match self.inner.list_all().await {
            Ok(tickets) => {
                let now = self.clock.now();
                *self.snapshot.write().await = Some(Snapshot {
                    tickets: tickets.clone(),
                    taken_at: now,
                });
                DegradedResponse::full(tickets, self.inner.name(), now)
            }
            Err(e) => {
                let warning = format!("{} unavailable: {}", self.inner.name(), e);
                warn!(store = self.inner.name(), error = %e, "Serving cached ticket snapshot");
                match self.snapshot.read().await.as_ref() {
                    Some(snap) => DegradedResponse::partial(
                        snap.tickets.clone(),
                        "snapshot",
                        snap.taken_at,
                        &warning,
                    ),
                    None => DegradedResponse::unavailable(Vec::new(), self.clock.now(), &warning),
                }
            }
        }
    }

    /// Keep the snapshot in step with a successful write
    async fn remember(&self, ticket: &Ticket) {
        if let Some(snap) = self.snapshot.write().await.as_mut() {
            match snap.tickets.iter_mut().find(|t| t.id == ticket.id) {
                Some(slot) => *slot = ticket.clone(),
                None => snap.tickets.push(ticket.clone()),
            }
        }
    }
}

#[async_trait]
impl TicketStore for CachedTicketStore {
    async fn list_all(&self) -> StoreResult<Vec<Ticket>> {
        self.inner.list_all().await
    }

    async fn get(&self, id: &TicketId) -> StoreResult<Option<Ticket>> {
        match self.inner.get(id).await {
            Ok(ticket) => Ok(ticket),
            Err(e) => {
                let cached = self
                    .snapshot
                    .read()
                    .await
                    .as_ref()
                    .and_then(|snap| snap.tickets.iter().find(|t| &t.id == id).cloned());
                match cached {
                    Some(ticket) => {
                        warn!(ticket_id = %id, error = %e, "Serving cached ticket");
                        Ok(Some(ticket))
                    }
                    None => Err(e),
                }
            }
        }
    }

    async fn insert(&self, ticket: Ticket) -> StoreResult<()> {
        self.inner.insert(ticket.clone()).await?;
        self.remember(&ticket).await;
        Ok(())
    }

    async fn update(&self, patch: &TicketPatch) -> StoreResult<PatchOutcome> {
        let outcome = self.inner.update(patch).await?;
        if let PatchOutcome::Applied(ticket) = &outcome {
            self.remember(ticket).await;
        }
        Ok(outcome)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::resilience::DegradationLevel;
    use crate::store::MemoryTicketStore;
    use crate::ticket::types::fixtures::open_ticket;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_falls_back_to_snapshot() {
        let inner = Arc::new(MemoryTicketStore::with_tickets([open_ticket("36", Utc::now())]));
        let cached = CachedTicketStore::new(inner.clone(), Arc::new(SystemClock));

        assert!(cached.read_all().await.is_full());

        inner.set_available(false);
        let stale = cached.read_all().await;
        assert_eq!(stale.level, DegradationLevel::Partial);
        assert_eq!(stale.payload.len(), 1);
        assert_eq!(stale.served_by, "snapshot");
    }

    #[tokio::test]
    async fn test_unavailable_without_snapshot() {
        let inner = Arc::new(MemoryTicketStore::new());
        inner.set_available(false);
        let cached = CachedTicketStore::new(inner, Arc::new(SystemClock));

        let response = cached.read_all().await;
        assert_eq!(response.level, DegradationLevel::Unavailable);
        assert!(response.payload.is_empty());
    }

    #[tokio::test]
    async fn test_writes_are_not_masked() {
        let inner = Arc::new(MemoryTicketStore::new());
        let cached = CachedTicketStore::new(inner.clone(), Arc::new(SystemClock));
        cached.read_all().await;

        inner.set_available(false);
        assert!(cached.insert(open_ticket("36", Utc::now())).await.is_err());
    }

    #[tokio::test]
    async fn test_get_uses_snapshot_when_down() {
        let ticket = open_ticket("36", Utc::now());
        let inner = Arc::new(MemoryTicketStore::with_tickets([ticket.clone()]));
        let cached = CachedTicketStore::new(inner.clone(), Arc::new(SystemClock));
        cached.read_all().await;

        inner.set_available(false);
        assert_eq!(cached.get(&ticket.id).await.unwrap(), Some(ticket));
    }
}
