use std::collections::HashMap;

use tracing::debug;

use crate::fbref::events::EventsInfo;
use crate::fbref::header::HeaderInfo;
use crate::fbref::lineups::{finalize_lineups, LineupsInfo};
use crate::fbref::player_stats::PlayerStatsInfo;
use crate::fbref::team_stats::TeamStatsInfo;
use crate::model::{Event, MatchRecord, PlayerRef, Score, Side};

pub(crate) const COMPETITION: &str = "Premier League";

/// Merge the five extractor outputs into the canonical record and run
/// the global invariant checks. Invariant failures become `warnings`
/// entries; the record is always emitted.
pub(crate) fn assemble(
    header: HeaderInfo,
    events: EventsInfo,
    mut lineups: LineupsInfo,
    player_stats: PlayerStatsInfo,
    team_stats: TeamStatsInfo,
    fixture_score: Option<Score>,
) -> MatchRecord {
    finalize_lineups(&mut lineups, &player_stats.stats);

    // The match-report score is authoritative; the caller-supplied
    // fixture score only fills a gap, and only when it validates.
    let score = header.score.or(fixture_score);

    let mut warnings = header.warnings;
    warnings.extend(events.warnings);
    warnings.extend(lineups.warnings);
    warnings.extend(player_stats.warnings);
    warnings.extend(team_stats.warnings);

    let mut record = MatchRecord {
        date: header.date,
        competition: COMPETITION.to_string(),
        home: header.home,
        away: header.away,
        score,
        venue: header.venue,
        referee: header.referee,
        attendance: header.attendance,
        lineups: lineups.lineups,
        events: events.events,
        player_stats: player_stats.stats,
        team_stats: team_stats.stats,
        warnings,
    };

    resolve_event_sides(&mut record);
    check_invariants(&mut record);
    debug!(
        warnings = record.warnings.len(),
        goals = record.events.goals.len(),
        "assembled match record"
    );
    record
}

/// Global checks every emitted record goes through: starting XI size,
/// bench/XI disjointness, event-side agreement with the stats rows,
/// and per-side goal-count reconciliation.
fn check_invariants(record: &mut MatchRecord) {
    let mut warnings = Vec::new();

    for (side, lineup) in [
        (Side::Home, &record.lineups.home),
        (Side::Away, &record.lineups.away),
    ] {
        if lineup.starting_xi.len() > 11 {
            warnings.push(format!(
                "{side} starting XI has {} players",
                lineup.starting_xi.len()
            ));
        }
        if lineup.starting_xi.len() < 11 && !lineup.starting_xi.is_empty() {
            warnings.push(format!(
                "{side} starting XI has only {} players",
                lineup.starting_xi.len()
            ));
        }
        for player in &lineup.starting_xi {
            if lineup.substitutes.iter().any(|s| s.name == player.name) {
                warnings.push(format!(
                    "{} appears in both the {side} starting XI and bench",
                    player.name
                ));
            }
        }
    }

    // Side index over stats rows, used to audit each event's side.
    let stats_side: HashMap<&str, Side> = record
        .player_stats
        .home
        .iter()
        .map(|row| (row.player.identity(), Side::Home))
        .chain(
            record
                .player_stats
                .away
                .iter()
                .map(|row| (row.player.identity(), Side::Away)),
        )
        .collect();
    let audit = |event_player: &PlayerRef, event_side: Side, warnings: &mut Vec<String>| {
        if let Some(&known) = stats_side.get(event_player.identity()) {
            if known != event_side {
                warnings.push(format!(
                    "event for {} is tagged {event_side} but their stats row is {known}",
                    event_player.name
                ));
            }
        }
    };
    for event in record
        .events
        .goals
        .iter()
        .chain(&record.events.cards)
        .chain(&record.events.substitutions)
    {
        audit(event.player(), event.side(), &mut warnings);
    }

    // Per-side agreement between goal events and summed player goals.
    for (side, rows) in [
        (Side::Home, &record.player_stats.home),
        (Side::Away, &record.player_stats.away),
    ] {
        let from_stats: u32 = rows.iter().filter_map(|r| r.goals.map(u32::from)).sum();
        let from_events = record
            .events
            .goals
            .iter()
            .filter(|g| g.side() == side)
            .count() as u32;
        if !rows.is_empty() && from_stats != from_events {
            warnings.push(format!(
                "{side} goal events ({from_events}) disagree with player stats ({from_stats})"
            ));
        }
    }

    if let Some(score) = record.score {
        debug_assert!(score.home <= Score::MAX_GOALS && score.away <= Score::MAX_GOALS);
    }

    record.warnings.extend(warnings);
}

/// Resolve an event side from the lineups when the extractor had to
/// guess: if the player is named in exactly one side's lineup, that
/// side wins over the heuristic. Assist records then follow the goal
/// they are credited on, so a corrected goal never leaves its assist
/// on the other side.
pub(crate) fn resolve_event_sides(record: &mut MatchRecord) {
    let side_of = |player: &PlayerRef| -> Option<Side> {
        let in_home = record
            .lineups
            .home
            .starting_xi
            .iter()
            .chain(&record.lineups.home.substitutes)
            .any(|p| p.name == player.name);
        let in_away = record
            .lineups
            .away
            .starting_xi
            .iter()
            .chain(&record.lineups.away.substitutes)
            .any(|p| p.name == player.name);
        match (in_home, in_away) {
            (true, false) => Some(Side::Home),
            (false, true) => Some(Side::Away),
            _ => None,
        }
    };

    let mut reassign = |events: &mut Vec<Event>| {
        for event in events.iter_mut() {
            let Some(correct) = side_of(event.player()) else {
                continue;
            };
            match event {
                Event::Goal { side, .. }
                | Event::Card { side, .. }
                | Event::Substitution { side, .. } => *side = correct,
            }
        }
    };
    let mut goals = std::mem::take(&mut record.events.goals);
    let mut cards = std::mem::take(&mut record.events.cards);
    let mut subs = std::mem::take(&mut record.events.substitutions);
    reassign(&mut goals);
    reassign(&mut cards);
    reassign(&mut subs);
    record.events.goals = goals;
    record.events.cards = cards;
    record.events.substitutions = subs;

    let mut assists = std::mem::take(&mut record.events.assists);
    for assist in &mut assists {
        let from_goal = record.events.goals.iter().find_map(|g| match g {
            Event::Goal {
                minute,
                side,
                assist: Some(credited),
                ..
            } if *minute == assist.minute && credited.name == assist.player.name => Some(*side),
            _ => None,
        });
        if let Some(side) = from_goal.or_else(|| side_of(&assist.player)) {
            assist.side = side;
        }
    }
    record.events.assists = assists;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AssistRecord, CardKind, Minute, PlayerMatchStats, TeamRef,
    };

    fn base_header() -> HeaderInfo {
        HeaderInfo {
            home: TeamRef::named("Liverpool"),
            away: TeamRef::named("Bournemouth"),
            ..HeaderInfo::default()
        }
    }

    #[test]
    fn report_score_beats_fixture_score() {
        let mut header = base_header();
        header.score = Score::new(1, 0);
        let record = assemble(
            header,
            EventsInfo::default(),
            LineupsInfo::default(),
            PlayerStatsInfo::default(),
            TeamStatsInfo::default(),
            Score::new(2, 2),
        );
        assert_eq!(record.score, Score::new(1, 0));
    }

    #[test]
    fn fixture_score_fills_the_gap() {
        let record = assemble(
            base_header(),
            EventsInfo::default(),
            LineupsInfo::default(),
            PlayerStatsInfo::default(),
            TeamStatsInfo::default(),
            Score::new(2, 2),
        );
        assert_eq!(record.score, Score::new(2, 2));
    }

    #[test]
    fn goal_count_mismatch_is_a_soft_warning() {
        let mut events = EventsInfo::default();
        events.events.goals.push(Event::Goal {
            scorer: PlayerRef::named("Hugo Ekitike"),
            minute: Minute::whole(37).unwrap(),
            side: Side::Home,
            assist: None,
        });
        let mut stats = PlayerStatsInfo::default();
        stats.stats.home.push(PlayerMatchStats {
            player: PlayerRef::named("Hugo Ekitike"),
            minutes: Some(90),
            goals: Some(2),
            ..PlayerMatchStats::default()
        });

        let record = assemble(
            base_header(),
            events,
            LineupsInfo::default(),
            stats,
            TeamStatsInfo::default(),
            None,
        );
        assert!(
            record
                .warnings
                .iter()
                .any(|w| w.contains("disagree with player stats")),
            "warnings: {:?}",
            record.warnings
        );
        assert_eq!(record.events.goals.len(), 1, "record still emitted");
    }

    #[test]
    fn event_side_audited_against_stats_rows() {
        let mut events = EventsInfo::default();
        events.events.cards.push(Event::Card {
            player: PlayerRef::named("Lewis Cook"),
            minute: Minute::whole(55).unwrap(),
            side: Side::Home,
            card: CardKind::Yellow,
        });
        let mut stats = PlayerStatsInfo::default();
        stats.stats.away.push(PlayerMatchStats {
            player: PlayerRef::named("Lewis Cook"),
            minutes: Some(90),
            ..PlayerMatchStats::default()
        });

        let record = assemble(
            base_header(),
            events,
            LineupsInfo::default(),
            stats,
            TeamStatsInfo::default(),
            None,
        );
        assert!(
            record
                .warnings
                .iter()
                .any(|w| w.contains("tagged home but their stats row is away")),
            "warnings: {:?}",
            record.warnings
        );
    }

    #[test]
    fn lineup_resolves_guessed_sides() {
        let mut record = assemble(
            base_header(),
            EventsInfo::default(),
            LineupsInfo::default(),
            PlayerStatsInfo::default(),
            TeamStatsInfo::default(),
            None,
        );
        record
            .lineups
            .away
            .starting_xi
            .push(PlayerRef::named("Marcos Senesi"));
        record.events.cards.push(Event::Card {
            player: PlayerRef::named("Marcos Senesi"),
            minute: Minute::whole(63).unwrap(),
            side: Side::Home,
            card: CardKind::Yellow,
        });
        resolve_event_sides(&mut record);
        assert_eq!(record.events.cards[0].side(), Side::Away);
    }

    #[test]
    fn assist_follows_its_corrected_goal() {
        let minute = Minute::whole(23).unwrap();
        let mut events = EventsInfo::default();
        events.events.goals.push(Event::Goal {
            scorer: PlayerRef::named("Antoine Semenyo"),
            minute,
            side: Side::Home,
            assist: Some(PlayerRef::named("David Brooks")),
        });
        events.events.assists.push(AssistRecord {
            player: PlayerRef::named("David Brooks"),
            minute,
            side: Side::Home,
        });
        let mut lineups = LineupsInfo::default();
        lineups
            .lineups
            .away
            .starting_xi
            .push(PlayerRef::named("Antoine Semenyo"));

        let record = assemble(
            base_header(),
            events,
            lineups,
            PlayerStatsInfo::default(),
            TeamStatsInfo::default(),
            None,
        );
        assert_eq!(record.events.goals[0].side(), Side::Away);
        assert_eq!(
            record.events.assists[0].side,
            Side::Away,
            "assist stays on the scoring team"
        );
    }
}
