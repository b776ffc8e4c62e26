use serde::Serialize;

/// A full-time (or current) scoreline.
///
/// Football scores are small; any candidate component above 15 or
/// wider than two digits is almost certainly a year, a day of the
/// month, or a jersey number, and is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub home: u8,
    pub away: u8,
}

impl Score {
    pub const MAX_GOALS: u8 = 15;

    pub fn new(home: u8, away: u8) -> Option<Self> {
        (home <= Self::MAX_GOALS && away <= Self::MAX_GOALS).then_some(Score { home, away })
    }

    /// Validate one textual score component. Rejects empty text,
    /// non-digits, more than two digits, and values above [`Self::MAX_GOALS`].
    pub fn valid_component(text: &str) -> Option<u8> {
        let text = text.trim();
        if text.is_empty() || text.len() > 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u8 = text.parse().ok()?;
        (value <= Self::MAX_GOALS).then_some(value)
    }

    /// Validate a `(home, away)` pair of textual components together;
    /// both must pass for the pair to be accepted.
    pub fn from_components(home: &str, away: &str) -> Option<Self> {
        Some(Score {
            home: Self::valid_component(home)?,
            away: Self::valid_component(away)?,
        })
    }
}
