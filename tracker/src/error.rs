//! Tracker error types
//!
//! Every fallible operation in the crate returns [`TrackerResult`]. Store and
//! photo collaborators have their own narrower error types which convert into
//! [`TrackerError`] at the workflow boundary.

use thiserror::Error;

use crate::escalation::tier::TierKey;
use crate::ticket::{TicketId, TicketState};

/// Result type alias for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors that can occur while driving the ticket workflow
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Backing store could not be reached
    #[error("Ticket store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// Photo upload failed; the triggering action was not applied
    #[error("Photo upload failed for '{name}': {message}")]
    UploadFailed { name: String, message: String },

    /// Another writer already consumed this transition
    #[error("Transition for ticket {ticket_id} already applied (state is now {actual})")]
    DuplicateTransition {
        ticket_id: TicketId,
        actual: TicketState,
    },

    /// Rating outside 1..=5 or ticket already rated
    #[error("Invalid rating for ticket {ticket_id}: {message}")]
    InvalidRating { ticket_id: TicketId, message: String },

    /// Caller requested a transition the current state does not allow
    #[error("Cannot {action} ticket {ticket_id} while it is {state}")]
    InvalidTransition {
        ticket_id: TicketId,
        action: &'static str,
        state: TicketState,
    },

    /// Ticket does not exist in the store
    #[error("Ticket not found: {ticket_id}")]
    TicketNotFound { ticket_id: TicketId },

    /// Reporter must review an earlier resolution before filing again
    #[error("Reporter {reporter} has ticket {ticket_id} awaiting review")]
    ReviewPending {
        reporter: String,
        ticket_id: TicketId,
    },

    /// Location string could not be parsed into a block/floor
    #[error("Invalid location '{input}': {message}")]
    InvalidLocation { input: String, message: String },

    /// Penalty already recorded for this ticket and tier
    #[error("Penalty {tier} already charged for ticket {ticket_id}")]
    PenaltyAlreadyCharged { ticket_id: TicketId, tier: TierKey },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// IO error wrapper
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    /// Create a store unavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create an upload failed error
    pub fn upload_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UploadFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid rating error
    pub fn invalid_rating(ticket_id: &TicketId, message: impl Into<String>) -> Self {
        Self::InvalidRating {
            ticket_id: ticket_id.clone(),
            message: message.into(),
        }
    }

    /// Create an invalid transition error
    pub fn invalid_transition(ticket_id: &TicketId, action: &'static str, state: TicketState) -> Self {
        Self::InvalidTransition {
            ticket_id: ticket_id.clone(),
            action,
            state,
        }
    }

    /// Create a ticket not found error
    pub fn not_found(ticket_id: &TicketId) -> Self {
        Self::TicketNotFound {
            ticket_id: ticket_id.clone(),
        }
    }

    /// Create an invalid location error
    pub fn invalid_location(input: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidLocation {
            input: input.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Check if this error is retryable (transient failure)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::StoreUnavailable { .. } | Self::UploadFailed { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Whether this error is a benign race with another writer.
    ///
    /// Engine passes swallow these instead of reporting them.
    pub fn is_silent(&self) -> bool {
        matches!(
            self,
            Self::DuplicateTransition { .. } | Self::PenaltyAlreadyCharged { .. }
        )
    }

    /// Get recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::StoreUnavailable { .. } => Some(
                "The store could not be reached. Views keep serving the last snapshot; \
                 the next poll retries automatically.",
            ),
            Self::UploadFailed { .. } => {
                Some("Nothing was changed. Retry the action once the photo store is reachable.")
            }
            Self::DuplicateTransition { .. } | Self::PenaltyAlreadyCharged { .. } => None,
            Self::InvalidRating { .. } => {
                Some("Ratings are whole numbers from 1 to 5 and can be submitted once per ticket.")
            }
            Self::InvalidTransition { .. } => {
                Some("Reload the ticket; its state changed since it was last displayed.")
            }
            Self::TicketNotFound { .. } => Some("Check the ticket identifier."),
            Self::ReviewPending { .. } => {
                Some("Rate or reject the pending resolution before filing a new complaint.")
            }
            Self::InvalidLocation { .. } => {
                Some("Use '<block>' or '<block>-<floor>', e.g. '36-2nd', or a 'block-36-2floor' link.")
            }
            Self::ConfigError { .. } => Some(
                "Check configuration settings. Verify paths exist and environment variables \
                 are set correctly.",
            ),
            Self::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => {
                    Some("File or directory not found. Check the path exists.")
                }
                std::io::ErrorKind::PermissionDenied => {
                    Some("Permission denied. Check file permissions: ls -la <path>")
                }
                _ => Some("IO error occurred. Check disk space and file permissions."),
            },
        }
    }

    /// Get error with recovery suggestion formatted
    pub fn with_suggestion(&self) -> String {
        match self.recovery_suggestion() {
            Some(suggestion) => format!("{}\n\nRecovery: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
