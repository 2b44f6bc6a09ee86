use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable user identifier, shared with the user directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(UserId)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId(id)
    }
}

/// One row of the quota ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Owner of the quota
    pub user_id: UserId,
    /// Units left to consume
    pub remaining: i64,
}

/// Result of a conditional decrement
///
/// The decrement floors at zero: when the entry is already exhausted the
/// store reports `remaining == 0` with `consumed == false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consumption {
    /// Value of the entry after the call
    pub remaining: i64,
    /// Whether a unit was actually taken
    pub consumed: bool,
}

impl Consumption {
    pub fn taken(remaining: i64) -> Self {
        Self {
            remaining,
            consumed: true,
        }
    }

    pub fn floored(remaining: i64) -> Self {
        Self {
            remaining,
            consumed: false,
        }
    }
}

/// How a replenishment tick clamps the raised value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplenishMode {
    /// `max(ceiling, remaining + increment)`: lifts every entry to at least
    /// the ceiling, and past it when the increment overshoots
    #[default]
    Raise,
    /// `min(ceiling, remaining + increment)`: never exceeds the ceiling
    Cap,
}

impl ReplenishMode {
    /// SQLite scalar function implementing the clamp
    pub(crate) fn sql_fn(self) -> &'static str {
        match self {
            Self::Raise => "MAX",
            Self::Cap => "MIN",
        }
    }
}

/// Parameters of one replenishment tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplenishPolicy {
    /// Units added to an entry below the ceiling
    pub increment: i64,
    /// Entries at or above this value are left alone
    pub ceiling: i64,
    #[serde(default)]
    pub mode: ReplenishMode,
}

impl ReplenishPolicy {
    pub fn new(increment: i64, ceiling: i64) -> Self {
        Self {
            increment,
            ceiling,
            mode: ReplenishMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ReplenishMode) -> Self {
        self.mode = mode;
        self
    }

    /// Value an entry holding `remaining` moves to, or `None` when the tick
    /// leaves it untouched
    pub fn next_value(&self, remaining: i64) -> Option<i64> {
        if remaining >= self.ceiling {
            return None;
        }
        let raised = remaining.saturating_add(self.increment);
        Some(match self.mode {
            ReplenishMode::Raise => raised.max(self.ceiling),
            ReplenishMode::Cap => raised.min(self.ceiling),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_parse() {
        assert_eq!("42".parse::<UserId>().unwrap(), UserId(42));
        assert_eq!(" 7 ".parse::<UserId>().unwrap(), UserId(7));
        assert!("alice".parse::<UserId>().is_err());
        assert!("".parse::<UserId>().is_err());
    }

    #[test]
    fn test_user_id_serializes_as_integer() {
        let json = serde_json::to_string(&UserId(3)).unwrap();
        assert_eq!(json, "3");
    }

    #[test]
    fn test_raise_overshoots_ceiling() {
        let policy = ReplenishPolicy::new(3, 10);
        assert_eq!(policy.next_value(9), Some(12));
        assert_eq!(policy.next_value(0), Some(10));
        assert_eq!(policy.next_value(8), Some(11));
    }

    #[test]
    fn test_cap_never_exceeds_ceiling() {
        let policy = ReplenishPolicy::new(3, 10).with_mode(ReplenishMode::Cap);
        assert_eq!(policy.next_value(9), Some(10));
        assert_eq!(policy.next_value(0), Some(3));
    }

    #[test]
    fn test_at_or_above_ceiling_untouched() {
        for mode in [ReplenishMode::Raise, ReplenishMode::Cap] {
            let policy = ReplenishPolicy::new(3, 10).with_mode(mode);
            assert_eq!(policy.next_value(10), None);
            assert_eq!(policy.next_value(25), None);
        }
    }

    #[test]
    fn test_mode_deserializes_lowercase() {
        let policy: ReplenishPolicy =
            toml::from_str("increment = 1\nceiling = 4\nmode = \"cap\"").unwrap();
        assert_eq!(policy.mode, ReplenishMode::Cap);

        let policy: ReplenishPolicy = toml::from_str("increment = 1\nceiling = 4").unwrap();
        assert_eq!(policy.mode, ReplenishMode::Raise);
    }
}
