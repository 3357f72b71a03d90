//! Hygiene Complaint Tracker
//!
//! Tracks facility-hygiene complaints from a reporter through the block
//! supervisor, the authority office and the vendor, with a deadline at each
//! step and penalties charged automatically when one lapses.
//!
//! # Components
//!
//! - [`escalation`]: the deadline ladder (pure engine + manual transitions)
//! - [`ticket`]: the ticket record, its states and compare-and-set patches
//! - [`store`]: ticket persistence (memory, JSON file, snapshot fallback)
//! - [`ledger`]: per-supervisor penalty and performance aggregates, ranking
//! - [`workflow`]: applies transitions against the stores and runs effects
//! - [`poller`]: runs the engine every few seconds
//! - [`views`]: per-portal buckets over the ticket states
//!
//! # Usage
//!
//! ```bash
//! # One engine pass against a JSON store
//! hygiene-tracker --store-path ./hygiene-store.json sweep
//!
//! # Keep polling until Ctrl-C
//! TRACKER_POLL_INTERVAL_SECS=5 hygiene-tracker poll
//!
//! # File a complaint from a QR deep link
//! hygiene-tracker submit --location block-36-2floor --category washroom \
//!     --description "Overflowing bin" --reporter-uid 123 --name "A Student" \
//!     --reg-no 21BCE0001 --phone 9876543210
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod clock;
pub mod config;
pub mod error;
pub mod escalation;
pub mod events;
pub mod ledger;
pub mod notify;
pub mod photo;
pub mod poller;
pub mod resilience;
pub mod store;
pub mod ticket;
pub mod views;
pub mod workflow;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use escalation::{
    EscalationEngine, EscalationOutcome, PenaltyEvent, SideEffect, Tier, TierKey, Transition,
    VendorDecision,
};
pub use events::{EventBus, SharedEventBus, TicketEvent};
pub use ledger::{LedgerEntry, LedgerStore, MemoryLedgerStore, RankedParty, ScoringLedger, Standing};
pub use notify::{AlertKind, AlertThrottle, LogNotifier, Notifier, NullNotifier};
pub use photo::{DirPhotoStore, MemoryPhotoStore, PhotoPayload, PhotoStore};
pub use poller::{Poller, PollerHandle};
pub use resilience::{DegradationLevel, DegradedResponse};
pub use store::{
    CachedTicketStore, JsonFileStore, MemoryTicketStore, PatchOutcome, StoreError, TicketStore,
};
pub use ticket::{
    Actor, Location, NewTicket, PartyId, Reporter, Ticket, TicketId, TicketPatch, TicketState,
};
pub use workflow::{PassReport, SharedWorkflow, Workflow};
