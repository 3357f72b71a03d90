//! Timed tiers, penalty keys and deadline arithmetic

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Minutes a responsible party has to accept a new ticket
pub const ACCEPTANCE_WINDOW_MINUTES: i64 = 10;

/// Minutes a responsible party has to resolve an accepted ticket
pub const RESOLUTION_WINDOW_MINUTES: i64 = 30;

/// Minutes the authority has after a missed resolution window
pub const AUTHORITY_WINDOW_MINUTES: i64 = 30;

/// Penalty count at which a party is warned
pub const WARN_PENALTY_THRESHOLD: u32 = 4;

/// Penalty count at which a party is flagged critical
pub const CRITICAL_PENALTY_THRESHOLD: u32 = 5;

/// Timed obligation windows, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Acceptance window (10 minutes)
    Acceptance,
    /// Resolution window (30 minutes)
    Resolution,
    /// Authority overtime window (30 minutes)
    AuthorityOvertime,
}

impl Tier {
    /// Length of this tier's window
    pub fn window(&self) -> Duration {
        match self {
            Self::Acceptance => Duration::minutes(ACCEPTANCE_WINDOW_MINUTES),
            Self::Resolution => Duration::minutes(RESOLUTION_WINDOW_MINUTES),
            Self::AuthorityOvertime => Duration::minutes(AUTHORITY_WINDOW_MINUTES),
        }
    }

    /// Deadline for a window opened at `start`
    pub fn deadline_from(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        start + self.window()
    }

    /// Penalty charged when this tier lapses; acceptance is free
    pub fn penalty_key(&self) -> Option<TierKey> {
        match self {
            Self::Acceptance => None,
            Self::Resolution => Some(TierKey::MissResolution),
            Self::AuthorityOvertime => Some(TierKey::MissFinal),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Acceptance => write!(f, "acceptance"),
            Self::Resolution => write!(f, "resolution"),
            Self::AuthorityOvertime => write!(f, "authority_overtime"),
        }
    }
}

/// Dedupe key suffix for penalty charges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKey {
    /// Resolution window missed
    MissResolution,
    /// Authority overtime window missed
    MissFinal,
    /// Vendor issued a warning after a quality dispute
    VendorWarning,
}

impl TierKey {
    pub const ALL: [TierKey; 3] = [Self::MissResolution, Self::MissFinal, Self::VendorWarning];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissResolution => "miss_resolution",
            Self::MissFinal => "miss_final",
            Self::VendorWarning => "vendor_warning",
        }
    }
}

impl std::fmt::Display for TierKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TierKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "miss_resolution" => Ok(Self::MissResolution),
            "miss_final" => Ok(Self::MissFinal),
            "vendor_warning" => Ok(Self::VendorWarning),
            other => Err(format!("unknown tier key '{}'", other)),
        }
    }
}

/// Time left until `deadline`; negative once overdue
pub fn remaining(now: DateTime<Utc>, deadline: DateTime<Utc>) -> Duration {
    deadline - now
}

/// `mm:ss` countdown, `00:00` once overdue
pub fn format_countdown(remaining: Duration) -> String {
    if remaining <= Duration::zero() {
        return "00:00".to_string();
    }
    let secs = remaining.num_seconds();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_tier_windows() {
        assert_eq!(Tier::Acceptance.window(), Duration::minutes(10));
        assert_eq!(Tier::Resolution.window(), Duration::minutes(30));
        assert_eq!(Tier::AuthorityOvertime.window(), Duration::minutes(30));
    }

    #[test]
    fn test_only_late_tiers_carry_penalties() {
        assert_eq!(Tier::Acceptance.penalty_key(), None);
        assert_eq!(Tier::Resolution.penalty_key(), Some(TierKey::MissResolution));
        assert_eq!(Tier::AuthorityOvertime.penalty_key(), Some(TierKey::MissFinal));
    }

    #[test]
    fn test_tier_key_parse() {
        for key in [TierKey::MissResolution, TierKey::MissFinal, TierKey::VendorWarning] {
            assert_eq!(key.as_str().parse::<TierKey>().unwrap(), key);
        }
        assert!("miss_acceptance".parse::<TierKey>().is_err());
    }

    #[test]
    fn test_remaining_and_countdown() {
        let now = Utc.with_ymd_and_hms(2025, 2, 21, 9, 0, 0).unwrap();
        let due = now + Duration::seconds(9 * 60 + 5);
        assert_eq!(format_countdown(remaining(now, due)), "09:05");
        assert_eq!(format_countdown(remaining(due, now)), "00:00");
        assert!(remaining(due + Duration::seconds(1), due) < Duration::zero());
    }
}
