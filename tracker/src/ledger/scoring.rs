//! Ledger mutation service
//!
//! All read-modify-write cycles on ledger entries go through one async
//! mutex, so two engine passes in the same process cannot interleave a
//! charge between another pass's read and write.

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::entry::{LedgerEntry, PenaltyKey};
use super::ranking::{rank, RankedParty};
use super::SharedLedgerStore;
use crate::error::{TrackerError, TrackerResult};
use crate::escalation::PenaltyEvent;
use crate::store::SharedTicketStore;
use crate::ticket::{PartyId, TicketId};

/// Serialized access to the ledger
pub struct ScoringLedger {
    entries: SharedLedgerStore,
    tickets: SharedTicketStore,
    lock: Mutex<()>,
}

impl ScoringLedger {
    pub fn new(entries: SharedLedgerStore, tickets: SharedTicketStore) -> Self {
        Self {
            entries,
            tickets,
            lock: Mutex::new(()),
        }
    }

    /// Current entry for `party` (zeroed if never referenced)
    pub async fn entry(&self, party: &PartyId) -> TrackerResult<LedgerEntry> {
        Ok(self.entries.get(party).await?)
    }

    /// Charge one penalty.
    ///
    /// Fails with [`TrackerError::PenaltyAlreadyCharged`] and leaves the
    /// ledger unchanged if the `(ticket, tier key)` pair was already charged.
    pub async fn add_penalty(&self, event: &PenaltyEvent) -> TrackerResult<LedgerEntry> {
        let _guard = self.lock.lock().await;
        let mut entry = self.entries.get(&event.party).await?;

        let key = PenaltyKey::new(event.ticket_id.clone(), event.tier_key);
        if !entry.charge(key) {
            debug!(
                party = %event.party,
                ticket_id = %event.ticket_id,
                tier = %event.tier_key,
                "Penalty already recorded"
            );
            return Err(TrackerError::PenaltyAlreadyCharged {
                ticket_id: event.ticket_id.clone(),
                tier: event.tier_key,
            });
        }

        self.entries.upsert(entry.clone()).await?;
        info!(
            party = %event.party,
            ticket_id = %event.ticket_id,
            tier = %event.tier_key,
            penalties = entry.penalty_count,
            "Penalty charged"
        );
        Ok(entry)
    }

    /// Recompute the party's average from every rated ticket.
    ///
    /// `ticket_id`/`rating` is counted even if the ticket store has not
    /// caught up with it yet.
    pub async fn record_rating(
        &self,
        party: &PartyId,
        ticket_id: &TicketId,
        rating: u8,
    ) -> TrackerResult<LedgerEntry> {
        let _guard = self.lock.lock().await;
        let tickets = self.tickets.list_all().await?;

        let mut ratings: Vec<u8> = tickets
            .iter()
            .filter(|t| &t.responsible_party == party && &t.id != ticket_id)
            .filter_map(|t| t.rating)
            .collect();
        ratings.push(rating);

        let mut entry = self.entries.get(party).await?;
        entry.set_ratings(&ratings);
        self.entries.upsert(entry.clone()).await?;
        debug!(party = %party, avg_rating = entry.avg_rating, rated = entry.rated_count, "Rating recorded");
        Ok(entry)
    }

    pub async fn record_resolution(&self, party: &PartyId, on_time: bool) -> TrackerResult<LedgerEntry> {
        let _guard = self.lock.lock().await;
        let mut entry = self.entries.get(party).await?;
        entry.record_resolution(on_time);
        self.entries.upsert(entry.clone()).await?;
        debug!(party = %party, on_time, resolved = entry.resolved_count, "Resolution recorded");
        Ok(entry)
    }

    pub async fn record_assignment(&self, party: &PartyId) -> TrackerResult<LedgerEntry> {
        let _guard = self.lock.lock().await;
        let mut entry = self.entries.get(party).await?;
        entry.record_assignment();
        self.entries.upsert(entry.clone()).await?;
        Ok(entry)
    }

    /// Leaderboard over every known party
    pub async fn ranking(&self) -> TrackerResult<Vec<RankedParty>> {
        Ok(rank(self.entries.list().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::TierKey;
    use crate::ledger::MemoryLedgerStore;
    use crate::store::{MemoryTicketStore, TicketStore};
    use crate::ticket::types::fixtures::open_ticket;
    use chrono::Utc;
    use std::sync::Arc;

    fn ledger_with(tickets: Arc<MemoryTicketStore>) -> ScoringLedger {
        ScoringLedger::new(Arc::new(MemoryLedgerStore::new()), tickets)
    }

    #[tokio::test]
    async fn test_add_penalty_dedupes() {
        let ledger = ledger_with(Arc::new(MemoryTicketStore::new()));
        let ticket = open_ticket("36", Utc::now());
        let event = PenaltyEvent::new(&ticket, TierKey::MissResolution);

        let entry = ledger.add_penalty(&event).await.unwrap();
        assert_eq!(entry.penalty_count, 1);

        let err = ledger.add_penalty(&event).await.unwrap_err();
        assert!(err.is_silent());
        assert_eq!(ledger.entry(&event.party).await.unwrap().penalty_count, 1);
    }

    #[tokio::test]
    async fn test_record_rating_uses_all_rated_tickets() {
        let now = Utc::now();
        let mut rated = open_ticket("36", now);
        rated.rating = Some(3);
        let mut other_party = open_ticket("35", now);
        other_party.rating = Some(1);
        let current = open_ticket("36", now);

        let tickets = Arc::new(MemoryTicketStore::with_tickets([
            rated,
            other_party,
            current.clone(),
        ]));
        let ledger = ledger_with(tickets);

        let entry = ledger
            .record_rating(&current.responsible_party, &current.id, 5)
            .await
            .unwrap();
        assert_eq!(entry.avg_rating, 4.0);
        assert_eq!(entry.rated_count, 2);
    }

    #[tokio::test]
    async fn test_record_rating_does_not_double_count_stored_rating() {
        let now = Utc::now();
        let mut current = open_ticket("36", now);
        current.rating = Some(2);
        let tickets = Arc::new(MemoryTicketStore::with_tickets([current.clone()]));
        let ledger = ledger_with(tickets.clone());

        let entry = ledger
            .record_rating(&current.responsible_party, &current.id, 2)
            .await
            .unwrap();
        assert_eq!(entry.rated_count, 1);
        assert_eq!(tickets.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolution_and_assignment_counters() {
        let ledger = ledger_with(Arc::new(MemoryTicketStore::new()));
        let party = PartyId::from("SUP-36");
        ledger.record_assignment(&party).await.unwrap();
        ledger.record_resolution(&party, true).await.unwrap();
        let entry = ledger.record_resolution(&party, false).await.unwrap();

        assert_eq!(entry.assigned_count, 1);
        assert_eq!(entry.resolved_count, 2);
        assert_eq!(entry.on_time_count, 1);
        assert_eq!(ledger.ranking().await.unwrap().len(), 1);
    }
}
