//! Degraded reads when the store is down
//!
//! Reads that cannot reach the backing store are answered from the last good
//! snapshot instead of failing. The response says which source served it so
//! views can show a stale-data banner.
//!
//! ```text
//! list_all()
//!   ├─ Store succeeds → DegradedResponse { level: Full, ... }, snapshot refreshed
//!   ├─ Store fails, snapshot cached → DegradedResponse { level: Partial, warnings, ... }
//!   └─ Store fails, nothing cached → DegradedResponse { level: Unavailable, ... }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How fresh the served data is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DegradationLevel {
    /// Read straight from the store
    Full,
    /// Served from a cached snapshot
    Partial,
    /// Nothing available; the payload is empty
    Unavailable,
}

impl std::fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Partial => write!(f, "partial"),
            Self::Unavailable => write!(f, "unavailable"),
        }
    }
}

/// A read result wrapped with freshness metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DegradedResponse<T> {
    pub payload: T,
    pub level: DegradationLevel,
    /// Which source produced this response
    pub served_by: String,
    pub warnings: Vec<String>,
    /// When the payload was last known to be current
    pub as_of: DateTime<Utc>,
}

impl<T> DegradedResponse<T> {
    /// Fresh read from the primary store
    pub fn full(payload: T, served_by: &str, as_of: DateTime<Utc>) -> Self {
        Self {
            payload,
            level: DegradationLevel::Full,
            served_by: served_by.to_string(),
            warnings: Vec::new(),
            as_of,
        }
    }

    /// Stale read from a fallback
    pub fn partial(payload: T, served_by: &str, as_of: DateTime<Utc>, warning: &str) -> Self {
        Self {
            payload,
            level: DegradationLevel::Partial,
            served_by: served_by.to_string(),
            warnings: vec![warning.to_string()],
            as_of,
        }
    }

    /// No source answered; `payload` is a best-effort default
    pub fn unavailable(payload: T, as_of: DateTime<Utc>, warning: &str) -> Self {
        Self {
            payload,
            level: DegradationLevel::Unavailable,
            served_by: "none".to_string(),
            warnings: vec![warning.to_string()],
            as_of,
        }
    }

    pub fn is_full(&self) -> bool {
        self.level == DegradationLevel::Full
    }

    pub fn is_degraded(&self) -> bool {
        self.level != DegradationLevel::Full
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        let now = Utc::now();
        assert!(DegradedResponse::full(1, "memory", now).is_full());
        let stale = DegradedResponse::partial(1, "snapshot", now, "store down");
        assert!(stale.is_degraded());
        assert_eq!(stale.warnings, vec!["store down"]);
        let none: DegradedResponse<Vec<u8>> = DegradedResponse::unavailable(vec![], now, "x");
        assert_eq!(none.level, DegradationLevel::Unavailable);
        assert_eq!(none.served_by, "none");
    }
}
