//! Destination zones.

use serde::{Deserialize, Serialize};

/// States shipped from the home warehouse's own state.
const LOCAL_STATES: &[&str] = &["CA"];

/// Neighbouring states reachable by regional ground networks.
const REGIONAL_STATES: &[&str] = &["AZ", "ID", "NV", "OR", "UT", "WA"];

/// Shipping zone derived from the destination state.
///
/// The three zones are disjoint: every state code maps to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Local,
    Regional,
    National,
}

impl Zone {
    /// Classifies a state code. Input is trimmed and case-insensitive.
    pub fn for_state(state: &str) -> Zone {
        let code = state.trim().to_ascii_uppercase();
        if LOCAL_STATES.contains(&code.as_str()) {
            Zone::Local
        } else if REGIONAL_STATES.contains(&code.as_str()) {
            Zone::Regional
        } else {
            Zone::National
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Local => "local",
            Zone::Regional => "regional",
            Zone::National => "national",
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert_eq!(Zone::for_state("CA"), Zone::Local);
        assert_eq!(Zone::for_state(" ca"), Zone::Local);
        assert_eq!(Zone::for_state("OR"), Zone::Regional);
        assert_eq!(Zone::for_state("nv"), Zone::Regional);
        assert_eq!(Zone::for_state("NY"), Zone::National);
        assert_eq!(Zone::for_state("TX"), Zone::National);
    }

    #[test]
    fn test_zone_lists_are_disjoint() {
        for state in LOCAL_STATES {
            assert!(!REGIONAL_STATES.contains(state));
        }
    }
}
