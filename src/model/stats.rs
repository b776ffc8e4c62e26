use serde::Serialize;

/// An "X of Y (Z%)" statistic: completed out of attempted, with the
/// site's own percentage. The three values are filled atomically; a
/// triple is either fully parsed or absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatTriple {
    pub completed: u16,
    pub attempted: u16,
    pub pct: f32,
}

/// Aggregate statistics for one side of a match. Every field is
/// independent; a missing or unparseable row leaves its field `None`,
/// never zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamMatchStats {
    pub possession_pct: Option<f32>,
    pub passing_accuracy: Option<StatTriple>,
    pub shots: Option<u16>,
    pub shots_on_target: Option<StatTriple>,
    pub saves: Option<StatTriple>,
    pub fouls: Option<u16>,
    pub corners: Option<u16>,
    pub crosses: Option<u16>,
    pub touches: Option<u16>,
    pub tackles: Option<u16>,
    pub interceptions: Option<u16>,
    pub aerials_won: Option<u16>,
    pub clearances: Option<u16>,
    pub offsides: Option<u16>,
    pub goal_kicks: Option<u16>,
    pub throw_ins: Option<u16>,
    pub long_balls: Option<u16>,
    pub yellow_cards: Option<u16>,
    pub red_cards: Option<u16>,
}
