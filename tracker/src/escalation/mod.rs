//! Deadline ladder for complaints
//!
//! Moves tickets between parties when their obligation windows lapse and
//! validates the transitions people trigger by hand. Both halves are pure:
//! they read a ticket and the current instant and return patches plus side
//! effects. The workflow applies them against a store.
//!
//! # Escalation Ladder
//!
//! ```text
//! AwaitingAcceptance (10 minutes)
//!     │
//!     ├─ Supervisor accepts → AwaitingResolution
//!     ├─ Window lapses → auto-accepted, no penalty
//!     │
//!     ▼
//! AwaitingResolution (30 minutes)
//!     │
//!     ├─ Evidence submitted → AwaitingReporterReview (rate ≥4 resolves,
//!     │                        <4 goes to authority review, reject reopens)
//!     ├─ Window lapses → EscalatedToAuthority, 1 penalty (miss_resolution)
//!     │
//!     ▼
//! EscalatedToAuthority (30 minutes)
//!     │
//!     ├─ Authority resolves → AuthorityResolved
//!     ├─ Window lapses → ClosedOverdue, 1 penalty (miss_final)
//! ```
//!
//! Low ratings take the review branch instead: PendingQualityReview →
//! (summon) ReportedToAuthority → clear, or EscalatedToVendor → vendor
//! clears or warns (warn charges `vendor_warning`).

pub mod engine;
pub mod tier;
pub mod transitions;

pub use engine::{EscalationEngine, EscalationOutcome, PenaltyEvent, TimedTransition};
pub use tier::{format_countdown, remaining, Tier, TierKey};
pub use transitions::{SideEffect, Transition, VendorDecision};
