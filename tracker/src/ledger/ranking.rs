//! Supervisor leaderboard

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::entry::LedgerEntry;
use crate::escalation::tier::{CRITICAL_PENALTY_THRESHOLD, WARN_PENALTY_THRESHOLD};

/// Disciplinary standing derived from the penalty count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    Good,
    /// One penalty away from critical
    Warned,
    /// Flagged for action
    Critical,
}

impl Standing {
    pub fn for_penalties(penalties: u32) -> Self {
        if penalties >= CRITICAL_PENALTY_THRESHOLD {
            Self::Critical
        } else if penalties >= WARN_PENALTY_THRESHOLD {
            Self::Warned
        } else {
            Self::Good
        }
    }
}

impl std::fmt::Display for Standing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Warned => write!(f, "warned"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedParty {
    /// 1-based position
    pub rank: usize,
    pub standing: Standing,
    pub entry: LedgerEntry,
}

/// Best first: rating desc, then penalties asc, then misses asc.
///
/// The sort is stable, so ties keep their input order.
pub fn rank(mut entries: Vec<LedgerEntry>) -> Vec<RankedParty> {
    entries.sort_by(compare);
    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| RankedParty {
            rank: i + 1,
            standing: Standing::for_penalties(entry.penalty_count),
            entry,
        })
        .collect()
}

fn compare(a: &LedgerEntry, b: &LedgerEntry) -> Ordering {
    b.avg_rating
        .total_cmp(&a.avg_rating)
        .then(a.penalty_count.cmp(&b.penalty_count))
        .then(a.missed_count.cmp(&b.missed_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::PartyId;

    fn entry(party: &str, rating: f64, penalties: u32, missed: u32) -> LedgerEntry {
        let mut e = LedgerEntry::new(PartyId::from(party));
        e.avg_rating = rating;
        e.penalty_count = penalties;
        e.missed_count = missed;
        e
    }

    fn order(ranked: &[RankedParty]) -> Vec<&str> {
        ranked.iter().map(|r| r.entry.party.as_str()).collect()
    }

    #[test]
    fn test_rating_then_penalties_then_misses() {
        let ranked = rank(vec![
            entry("SUP-1", 3.0, 0, 0),
            entry("SUP-2", 4.5, 2, 2),
            entry("SUP-3", 4.5, 1, 3),
            entry("SUP-4", 4.5, 1, 1),
        ]);
        assert_eq!(order(&ranked), vec!["SUP-4", "SUP-3", "SUP-2", "SUP-1"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[3].rank, 4);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranked = rank(vec![entry("SUP-9", 4.0, 1, 1), entry("SUP-2", 4.0, 1, 1)]);
        assert_eq!(order(&ranked), vec!["SUP-9", "SUP-2"]);
    }

    #[test]
    fn test_standing_thresholds() {
        assert_eq!(Standing::for_penalties(3), Standing::Good);
        assert_eq!(Standing::for_penalties(4), Standing::Warned);
        assert_eq!(Standing::for_penalties(5), Standing::Critical);
        assert_eq!(Standing::for_penalties(12), Standing::Critical);
    }
}
