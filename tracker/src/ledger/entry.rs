//! Ledger aggregate record

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::escalation::tier::TierKey;
use crate::ticket::{PartyId, TicketId};

/// Dedupe key for one penalty charge
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PenaltyKey {
    pub ticket_id: TicketId,
    pub tier_key: TierKey,
}

impl PenaltyKey {
    pub fn new(ticket_id: TicketId, tier_key: TierKey) -> Self {
        Self { ticket_id, tier_key }
    }

    /// Parse the `<ticket>_<tier_key>` storage form
    pub fn parse(raw: &str) -> Option<Self> {
        TierKey::ALL.iter().find_map(|key| {
            raw.strip_suffix(key.as_str())
                .and_then(|rest| rest.strip_suffix('_'))
                .filter(|ticket| !ticket.is_empty())
                .map(|ticket| Self::new(TicketId::from(ticket), *key))
        })
    }
}

impl std::fmt::Display for PenaltyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.ticket_id, self.tier_key)
    }
}

/// Aggregates for one responsible party
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub party: PartyId,
    /// Black points
    pub penalty_count: u32,
    pub resolved_count: u32,
    pub missed_count: u32,
    pub on_time_count: u32,
    pub assigned_count: u32,
    /// Resolution windows missed
    pub escalated_count: u32,
    /// Mean over all rated tickets; 0.0 while unrated
    pub avg_rating: f64,
    pub rated_count: u32,
    pub penalized: BTreeSet<PenaltyKey>,
}

impl LedgerEntry {
    pub fn new(party: PartyId) -> Self {
        Self {
            party,
            penalty_count: 0,
            resolved_count: 0,
            missed_count: 0,
            on_time_count: 0,
            assigned_count: 0,
            escalated_count: 0,
            avg_rating: 0.0,
            rated_count: 0,
            penalized: BTreeSet::new(),
        }
    }

    /// Record a penalty; returns false if this key was already charged
    pub fn charge(&mut self, key: PenaltyKey) -> bool {
        if self.has_charged(&key) {
            return false;
        }
        let tier_key = key.tier_key;
        self.penalized.insert(key);
        self.penalty_count += 1;
        self.missed_count += 1;
        if tier_key == TierKey::MissResolution {
            self.escalated_count += 1;
        }
        true
    }

    pub fn has_charged(&self, key: &PenaltyKey) -> bool {
        self.penalized.contains(key)
    }

    pub fn record_resolution(&mut self, on_time: bool) {
        self.resolved_count += 1;
        if on_time {
            self.on_time_count += 1;
        }
    }

    pub fn record_assignment(&mut self) {
        self.assigned_count += 1;
    }

    /// Replace the average with the exact mean of `ratings`
    pub fn set_ratings(&mut self, ratings: &[u8]) {
        self.rated_count = ratings.len() as u32;
        self.avg_rating = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64
        };
    }

    /// Share of resolutions that were on time, as a percentage
    pub fn on_time_rate(&self) -> Option<f64> {
        (self.resolved_count > 0)
            .then(|| f64::from(self.on_time_count) * 100.0 / f64::from(self.resolved_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(ticket: &str, tier_key: TierKey) -> PenaltyKey {
        PenaltyKey::new(TicketId::from(ticket), tier_key)
    }

    #[test]
    fn test_charge_is_deduplicated() {
        let mut entry = LedgerEntry::new(PartyId::from("SUP-36"));
        assert!(entry.charge(key("HYG-A", TierKey::MissResolution)));
        assert!(!entry.charge(key("HYG-A", TierKey::MissResolution)));
        assert!(entry.charge(key("HYG-A", TierKey::MissFinal)));
        assert!(entry.has_charged(&key("HYG-A", TierKey::MissFinal)));
        assert!(!entry.has_charged(&key("HYG-B", TierKey::MissFinal)));

        assert_eq!(entry.penalty_count, 2);
        assert_eq!(entry.missed_count, 2);
        assert_eq!(entry.escalated_count, 1);
    }

    #[test]
    fn test_ratings_mean_is_exact() {
        let mut entry = LedgerEntry::new(PartyId::from("SUP-36"));
        entry.set_ratings(&[5, 4, 2]);
        assert!((entry.avg_rating - 11.0 / 3.0).abs() < f64::EPSILON);
        assert_eq!(entry.rated_count, 3);
        entry.set_ratings(&[]);
        assert_eq!(entry.avg_rating, 0.0);
    }

    #[test]
    fn test_on_time_rate() {
        let mut entry = LedgerEntry::new(PartyId::from("SUP-36"));
        assert_eq!(entry.on_time_rate(), None);
        entry.record_resolution(true);
        entry.record_resolution(false);
        assert_eq!(entry.on_time_rate(), Some(50.0));
    }

    #[test]
    fn test_penalty_key_storage_form() {
        let k = key("HYG-7KQ2M9XD", TierKey::MissFinal);
        assert_eq!(k.to_string(), "HYG-7KQ2M9XD_miss_final");
        assert_eq!(PenaltyKey::parse("HYG-7KQ2M9XD_miss_final"), Some(k));
        assert_eq!(
            PenaltyKey::parse("HYG-1_vendor_warning").unwrap().tier_key,
            TierKey::VendorWarning
        );
        assert_eq!(PenaltyKey::parse("HYG-1_miss_acceptance"), None);
        assert_eq!(PenaltyKey::parse("_miss_final"), None);
    }
}
