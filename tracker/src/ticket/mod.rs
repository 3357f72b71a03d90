//! Ticket domain model
//!
//! - `state.rs`: the closed [`TicketState`] enum
//! - `types.rs`: [`Ticket`] and its identity, evidence, deadline and flag parts
//! - `location.rs`: block/floor parsing and responsible-party derivation
//! - `patch.rs`: [`TicketPatch`], one compare-and-set transition

pub mod location;
pub mod patch;
pub mod state;
pub mod types;

pub use location::Location;
pub use patch::TicketPatch;
pub use state::TicketState;
pub use types::{
    Actor, Deadlines, Evidence, NewTicket, PartyId, Reporter, Ticket, TicketFlags, TicketId,
    TimelineEvent,
};
