//! Scoring ledger: per-party penalty and performance aggregates
//!
//! One [`LedgerEntry`] per responsible party, created lazily on first
//! reference. Penalties are deduplicated by `(ticket, tier key)` so a
//! repeated engine pass can never charge the same miss twice.
//!
//! - `entry.rs`: the aggregate record and its dedupe set
//! - `scoring.rs`: [`ScoringLedger`], the serialized mutation service
//! - `ranking.rs`: leaderboard ordering and standing thresholds

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::StoreResult;
use crate::ticket::PartyId;

pub mod entry;
pub mod ranking;
pub mod scoring;

pub use entry::{LedgerEntry, PenaltyKey};
pub use ranking::{rank, RankedParty, Standing};
pub use scoring::ScoringLedger;

/// Shared ledger store handle
pub type SharedLedgerStore = Arc<dyn LedgerStore>;

/// Persistence for ledger entries
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Entry for `party`, or a fresh zeroed entry if none exists yet
    async fn get(&self, party: &PartyId) -> StoreResult<LedgerEntry>;

    async fn upsert(&self, entry: LedgerEntry) -> StoreResult<()>;

    /// Every stored entry, ordered by party
    async fn list(&self) -> StoreResult<Vec<LedgerEntry>>;
}

/// In-process ledger store
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    entries: RwLock<BTreeMap<PartyId, LedgerEntry>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get(&self, party: &PartyId) -> StoreResult<LedgerEntry> {
        Ok(self
            .entries
            .read()
            .await
            .get(party)
            .cloned()
            .unwrap_or_else(|| LedgerEntry::new(party.clone())))
    }

    async fn upsert(&self, entry: LedgerEntry) -> StoreResult<()> {
        self.entries
            .write()
            .await
            .insert(entry.party.clone(), entry);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<LedgerEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }
}
