//! JSON-file store
//!
//! Keeps both tables in one JSON document:
//!
//! ```json
//! { "complaints": { "<ticket_id>": { ... } }, "supervisor_stats": { "<uid>": { ... } } }
//! ```
//!
//! The document is loaded once on open and rewritten (temp file + rename)
//! after every mutation. All access goes through one async mutex, which
//! makes updates compare-and-set within a process. Full scans skip rows that
//! no longer convert to domain types and log them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::schema::{LedgerRow, TicketRow};
use super::{PatchOutcome, StoreError, StoreResult, TicketStore};
use crate::ledger::{LedgerEntry, LedgerStore};
use crate::ticket::{PartyId, Ticket, TicketId, TicketPatch};

/// On-disk document
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    complaints: BTreeMap<String, TicketRow>,
    #[serde(default)]
    supervisor_stats: BTreeMap<String, LedgerRow>,
}

/// Shared reference to JsonFileStore
pub type SharedJsonFileStore = Arc<JsonFileStore>;

/// Ticket and ledger store persisted to a single JSON file
pub struct JsonFileStore {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl JsonFileStore {
    /// Open the store at `path`, creating an empty document if missing
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let doc = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Document::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Deserialization(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(e.into()),
        };
        debug!(
            path = %path.display(),
            tickets = doc.complaints.len(),
            parties = doc.supervisor_stats.len(),
            "Opened JSON store"
        );
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedJsonFileStore {
        Arc::new(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, doc: &Document) -> StoreResult<()> {
        let bytes =
            serde_json::to_vec_pretty(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl TicketStore for JsonFileStore {
    async fn list_all(&self) -> StoreResult<Vec<Ticket>> {
        let doc = self.doc.lock().await;
        Ok(doc
            .complaints
            .iter()
            .filter_map(|(key, row)| match row.clone().into_ticket() {
                Ok(ticket) => Some(ticket),
                Err(e) => {
                    warn!(ticket_id = %key, error = %e, "Skipping unreadable ticket row");
                    None
                }
            })
            .collect())
    }

    async fn get(&self, id: &TicketId) -> StoreResult<Option<Ticket>> {
        let doc = self.doc.lock().await;
        doc.complaints
            .get(id.as_str())
            .cloned()
            .map(TicketRow::into_ticket)
            .transpose()
    }

    async fn insert(&self, ticket: Ticket) -> StoreResult<()> {
        let mut doc = self.doc.lock().await;
        if doc.complaints.contains_key(ticket.id.as_str()) {
            return Err(StoreError::AlreadyExists(ticket.id.to_string()));
        }
        doc.complaints
            .insert(ticket.id.to_string(), TicketRow::from_ticket(&ticket));
        if let Err(e) = self.persist(&doc).await {
            doc.complaints.remove(ticket.id.as_str());
            return Err(e);
        }
        Ok(())
    }

    async fn update(&self, patch: &TicketPatch) -> StoreResult<PatchOutcome> {
        let mut doc = self.doc.lock().await;
        let Some(row) = doc.complaints.get(patch.ticket_id.as_str()).cloned() else {
            return Ok(PatchOutcome::Missing);
        };

        let mut ticket = row.clone().into_ticket()?;
        if let Err(actual) = patch.apply(&mut ticket) {
            return Ok(PatchOutcome::Stale { actual });
        }

        doc.complaints
            .insert(ticket.id.to_string(), TicketRow::from_ticket(&ticket));
        if let Err(e) = self.persist(&doc).await {
            doc.complaints.insert(ticket.id.to_string(), row);
            return Err(e);
        }
        Ok(PatchOutcome::Applied(Box::new(ticket)))
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}

#[async_trait]
impl LedgerStore for JsonFileStore {
    async fn get(&self, party: &PartyId) -> StoreResult<LedgerEntry> {
        let doc = self.doc.lock().await;
        match doc.supervisor_stats.get(party.as_str()) {
            Some(row) => row.clone().into_entry(),
            None => Ok(LedgerEntry::new(party.clone())),
        }
    }

    async fn upsert(&self, entry: LedgerEntry) -> StoreResult<()> {
        let mut doc = self.doc.lock().await;
        let previous = doc
            .supervisor_stats
            .insert(entry.party.to_string(), LedgerRow::from_entry(&entry));
        if let Err(e) = self.persist(&doc).await {
            match previous {
                Some(row) => doc.supervisor_stats.insert(entry.party.to_string(), row),
                None => doc.supervisor_stats.remove(entry.party.as_str()),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<LedgerEntry>> {
        let doc = self.doc.lock().await;
        Ok(doc
            .supervisor_stats
            .iter()
            .filter_map(|(key, row)| match row.clone().into_entry() {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(party = %key, error = %e, "Skipping unreadable ledger row");
                    None
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::TierKey;
    use crate::ledger::PenaltyKey;
    use crate::ticket::types::fixtures::open_ticket;
    use crate::ticket::{Actor, TicketState, TimelineEvent};
    use chrono::Utc;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_opens_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("store.json")).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(LedgerStore::list(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tickets_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let now = Utc::now();
        let ticket = open_ticket("36", now);

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.insert(ticket.clone()).await.unwrap();
            let patch = TicketPatch::transition(
                &ticket,
                TicketState::AwaitingResolution,
                TimelineEvent::new("accepted", now, Actor::user("SUP-36")),
            );
            assert!(matches!(
                store.update(&patch).await.unwrap(),
                PatchOutcome::Applied(_)
            ));
            assert!(matches!(
                store.update(&patch).await.unwrap(),
                PatchOutcome::Stale { .. }
            ));
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let stored = TicketStore::get(&reopened, &ticket.id).await.unwrap().unwrap();
        assert_eq!(stored.state, TicketState::AwaitingResolution);
        assert_eq!(stored.timeline.len(), 2);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"pending_supervisor\""));
    }

    #[tokio::test]
    async fn test_ledger_rows_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("store.json");
        let party = PartyId::from("SUP-36");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            let mut entry = LedgerStore::get(&store, &party).await.unwrap();
            entry.charge(PenaltyKey::new(TicketId::from("HYG-A"), TierKey::MissFinal));
            store.upsert(entry).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let entry = LedgerStore::get(&reopened, &party).await.unwrap();
        assert_eq!(entry.penalty_count, 1);
        assert!(entry.has_charged(&PenaltyKey::new(TicketId::from("HYG-A"), TierKey::MissFinal)));
    }

    #[tokio::test]
    async fn test_bad_row_is_skipped_by_scans() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let now = Utc::now();
        let good = open_ticket("36", now);
        let bad = open_ticket("12", now);

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.insert(good.clone()).await.unwrap();
            store.insert(bad.clone()).await.unwrap();
        }

        let mut raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        raw["complaints"][bad.id.as_str()]["status"] = serde_json::json!("archived");
        std::fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, good.id);
        assert!(TicketStore::get(&store, &bad.id).await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(
            JsonFileStore::open(&path).await,
            Err(StoreError::Deserialization(_))
        ));
    }
}
