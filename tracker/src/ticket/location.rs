//! Facility locations and responsible-party derivation
//!
//! Complaints arrive either from the form (`36` or `36-2nd`) or from a QR
//! deep link (`block-36-2floor`). Both parse into the same [`Location`].

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::types::PartyId;
use crate::error::{TrackerError, TrackerResult};

static FORM_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,4})(?:-([A-Za-z0-9]{1,8}))?$").unwrap());

static DEEP_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^block-(\d{1,4})(?:-([A-Za-z0-9]{1,8}))?$").unwrap());

/// Prefix of supervisor party identifiers
pub const SUPERVISOR_PREFIX: &str = "SUP-";

/// A facility block with an optional floor
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub block: String,
    pub floor: Option<String>,
}

impl Location {
    pub fn new(block: impl Into<String>, floor: Option<String>) -> Self {
        Self {
            block: block.into(),
            floor,
        }
    }

    /// Parse a form value or a QR deep link
    pub fn parse(input: &str) -> TrackerResult<Self> {
        let trimmed = input.trim();

        if let Some(caps) = DEEP_LINK.captures(trimmed) {
            let floor = caps.get(2).map(|m| normalize_floor(m.as_str()));
            return Ok(Self::new(&caps[1], floor));
        }

        if let Some(caps) = FORM_VALUE.captures(trimmed) {
            let floor = caps.get(2).map(|m| m.as_str().to_string());
            return Ok(Self::new(&caps[1], floor));
        }

        Err(TrackerError::invalid_location(
            input,
            "expected '<block>', '<block>-<floor>' or 'block-<block>-<floor>'",
        ))
    }

    /// The supervisor responsible for this block.
    ///
    /// Derived once when the ticket is created; floors share a supervisor.
    pub fn responsible_party(&self) -> PartyId {
        PartyId::new(format!("{}{}", SUPERVISOR_PREFIX, self.block))
    }

    /// Compact `<block>[-<floor>]` form, as stored
    pub fn form_value(&self) -> String {
        match &self.floor {
            Some(floor) => format!("{}-{}", self.block, floor),
            None => self.block.clone(),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.floor {
            Some(floor) => write!(f, "Block {} - Floor {}", self.block, floor),
            None => write!(f, "Block {}", self.block),
        }
    }
}

/// Map QR floor aliases (`2floor`) onto form floor names (`2nd`)
fn normalize_floor(raw: &str) -> String {
    match raw {
        "2floor" => "2nd".to_string(),
        "3floor" => "3rd".to_string(),
        "5floor" => "5th".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_form_values() {
        let loc = Location::parse("36-2nd").unwrap();
        assert_eq!(loc.block, "36");
        assert_eq!(loc.floor.as_deref(), Some("2nd"));

        let loc = Location::parse("35").unwrap();
        assert_eq!(loc.block, "35");
        assert!(loc.floor.is_none());
    }

    #[test]
    fn test_parse_deep_link_with_floor_alias() {
        let loc = Location::parse("block-36-2floor").unwrap();
        assert_eq!(loc, Location::new("36", Some("2nd".to_string())));

        let loc = Location::parse("block-34-4floor").unwrap();
        assert_eq!(loc.floor.as_deref(), Some("4floor"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Location::parse("").is_err());
        assert!(Location::parse("block-").is_err());
        assert!(Location::parse("north wing").is_err());
    }

    #[test]
    fn test_responsible_party_ignores_floor() {
        let a = Location::parse("36-2nd").unwrap().responsible_party();
        let b = Location::parse("block-36-5floor").unwrap().responsible_party();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "SUP-36");
    }

    #[test]
    fn test_form_value_roundtrips_through_parse() {
        let loc = Location::new("34", Some("3rd".to_string()));
        assert_eq!(Location::parse(&loc.form_value()).unwrap(), loc);
        assert_eq!(loc.to_string(), "Block 34 - Floor 3rd");
    }
}
