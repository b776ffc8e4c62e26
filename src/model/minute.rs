use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};

/// Bases that can legally carry added time.
pub const ADDED_TIME_BASES: [u8; 4] = [45, 90, 105, 120];

/// A match minute, either a whole minute or a `base+added` pair
/// (e.g. the fourth minute of first-half stoppage time is `45+4`).
///
/// Added time is never collapsed into the base: `90+4` and `94` are
/// distinct minutes and sort differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Minute {
    Whole(u8),
    Added { base: u8, added: u8 },
}

impl Minute {
    /// Build a whole minute, rejecting anything outside `[0, 120]`.
    pub fn whole(minute: u8) -> Option<Self> {
        (minute <= 120).then_some(Minute::Whole(minute))
    }

    /// Build an added-time minute. The base must be the end of a
    /// regulation or extra-time period and the added part in `[1, 30]`.
    pub fn added(base: u8, added: u8) -> Option<Self> {
        (ADDED_TIME_BASES.contains(&base) && (1..=30).contains(&added))
            .then_some(Minute::Added { base, added })
    }

    /// The base minute, with any added time stripped. This is what a
    /// per-player "minutes played" integer column stores.
    pub fn base(&self) -> u8 {
        match *self {
            Minute::Whole(m) => m,
            Minute::Added { base, .. } => base,
        }
    }

    fn sort_key(&self) -> (u8, u8) {
        match *self {
            Minute::Whole(m) => (m, 0),
            Minute::Added { base, added } => (base, added),
        }
    }
}

impl Ord for Minute {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Minute {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Minute {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Minute::Whole(m) => write!(f, "{m}"),
            Minute::Added { base, added } => write!(f, "{base}+{added}"),
        }
    }
}

impl Serialize for Minute {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_minute_range() {
        assert_eq!(Minute::whole(0), Some(Minute::Whole(0)));
        assert_eq!(Minute::whole(120), Some(Minute::Whole(120)));
        assert_eq!(Minute::whole(121), None);
    }

    #[test]
    fn added_time_bases() {
        assert!(Minute::added(45, 2).is_some());
        assert!(Minute::added(90, 30).is_some());
        assert!(Minute::added(73, 1).is_none(), "73 is not a period end");
        assert!(Minute::added(90, 0).is_none());
        assert!(Minute::added(90, 31).is_none());
    }

    #[test]
    fn serialises_as_decimal_string() {
        assert_eq!(serde_json::to_string(&Minute::Whole(73)).unwrap(), "\"73\"");
        assert_eq!(
            serde_json::to_string(&Minute::Added { base: 90, added: 4 }).unwrap(),
            "\"90+4\""
        );
    }

    #[test]
    fn added_time_sorts_before_next_period() {
        let a = Minute::added(45, 12).unwrap();
        let b = Minute::whole(46).unwrap();
        assert!(a < b, "45+12 belongs to the first half");
    }
}
