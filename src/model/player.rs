use serde::Serialize;

/// A player as referenced in a match.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerRef {
    pub name: String,
    /// 8-hex fbref player id, same shape as a team id.
    pub site_id: Option<String>,
    pub position: Option<String>,
    /// Shirt number, `1..=99` when present.
    pub jersey_number: Option<u8>,
}

impl PlayerRef {
    pub fn named(name: impl Into<String>) -> Self {
        PlayerRef {
            name: name.into(),
            ..PlayerRef::default()
        }
    }

    /// Identity rule: two refs are the same player iff their site ids
    /// match; when both lack an id, fall back to exact name equality.
    pub fn same_player(&self, other: &PlayerRef) -> bool {
        match (&self.site_id, &other.site_id) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.name == other.name,
            _ => false,
        }
    }

    /// Dedup key for event merging: site id when known, name otherwise.
    pub fn identity(&self) -> &str {
        self.site_id.as_deref().unwrap_or(&self.name)
    }
}

/// Match-level statistics for one player, from a summary stats table.
/// Every numeric field is optional; absence means the page did not
/// report it, which is distinct from zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerMatchStats {
    pub player: PlayerRef,
    pub minutes: Option<u8>,
    pub goals: Option<u8>,
    pub assists: Option<u8>,
    pub shots: Option<u8>,
    pub shots_on_target: Option<u8>,
    pub passes_attempted: Option<u16>,
    pub pass_accuracy_pct: Option<f32>,
    pub tackles: Option<u8>,
    pub interceptions: Option<u8>,
    pub fouls: Option<u8>,
    /// Encoded card string: "Y", "YY", "R", "YR", or empty.
    pub cards: Option<String>,
}
