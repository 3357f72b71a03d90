//! Ticket persistence
//!
//! The workflow talks to storage only through [`TicketStore`]. Updates are
//! compare-and-set on the ticket's current state: a patch built from a stale
//! snapshot comes back as [`PatchOutcome::Stale`] instead of overwriting a
//! concurrent writer's transition.
//!
//! Implementations:
//! - [`MemoryTicketStore`]: process-local, used by tests and embedding
//! - [`JsonFileStore`]: one JSON document on disk, storage rows per [`schema`]
//! - [`CachedTicketStore`]: wraps another store and serves the last good
//!   snapshot while it is down

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;
use crate::ticket::{Ticket, TicketId, TicketPatch, TicketState};

pub mod cache;
pub mod file;
pub mod memory;
pub mod schema;

pub use cache::CachedTicketStore;
pub use file::JsonFileStore;
pub use memory::MemoryTicketStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for TrackerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Io(e) => TrackerError::Io(e),
            other => TrackerError::store_unavailable(other.to_string()),
        }
    }
}

/// Result of a compare-and-set update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PatchOutcome {
    /// Patch applied; the updated ticket
    Applied(Box<Ticket>),
    /// Ticket was no longer in the expected state
    Stale { actual: TicketState },
    /// No ticket with that id
    Missing,
}

/// Shared ticket store handle
pub type SharedTicketStore = Arc<dyn TicketStore>;

/// Read-all / read-by-id / insert / patch-by-id over tickets
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Every ticket, ordered by id
    async fn list_all(&self) -> StoreResult<Vec<Ticket>>;

    async fn get(&self, id: &TicketId) -> StoreResult<Option<Ticket>>;

    /// Insert a new ticket; fails if the id is taken
    async fn insert(&self, ticket: Ticket) -> StoreResult<()>;

    /// Apply `patch` if the ticket is still in `patch.expected_state`
    async fn update(&self, patch: &TicketPatch) -> StoreResult<PatchOutcome>;

    /// Identifies the store in logs and degraded responses
    fn name(&self) -> &'static str;
}
