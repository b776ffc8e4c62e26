use chrono::NaiveDate;
use serde::Serialize;

use super::{
    AssistRecord, Event, PlayerMatchStats, PlayerRef, Score, TeamMatchStats, TeamRef,
};

/// One side's named players: the eleven who start and the bench.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TeamLineup {
    pub starting_xi: Vec<PlayerRef>,
    pub substitutes: Vec<PlayerRef>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchLineups {
    pub home: TeamLineup,
    pub away: TeamLineup,
}

/// All timeline events, split by kind. Goal events also appear here
/// with their assist embedded; `assists` is the flat credited list.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchEvents {
    pub goals: Vec<Event>,
    pub assists: Vec<AssistRecord>,
    pub cards: Vec<Event>,
    pub substitutions: Vec<Event>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchPlayerStats {
    pub home: Vec<PlayerMatchStats>,
    pub away: Vec<PlayerMatchStats>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MatchTeamStats {
    pub home: TeamMatchStats,
    pub away: TeamMatchStats,
}

/// The canonical per-match output record. Constructed once by the
/// assembler and immutable afterwards; serialises to one JSON file.
#[derive(Debug, Clone, Serialize)]
pub struct MatchRecord {
    pub date: Option<NaiveDate>,
    pub competition: String,
    pub home: TeamRef,
    pub away: TeamRef,
    pub score: Option<Score>,
    pub venue: Option<String>,
    pub referee: Option<String>,
    pub attendance: Option<u32>,
    pub lineups: MatchLineups,
    pub events: MatchEvents,
    pub player_stats: MatchPlayerStats,
    pub team_stats: MatchTeamStats,
    /// Soft invariant violations and heuristic fallbacks; never fatal.
    pub warnings: Vec<String>,
}
