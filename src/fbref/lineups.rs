use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::Result;
use crate::fbref::{self, element_text, team_names_match};
use crate::fbref::header::HeaderInfo;
use crate::model::{MatchLineups, MatchPlayerStats, PlayerRef, Side, TeamLineup};

/// Output of the lineups pass, before the stats-aware post-processing
/// step that runs during assembly.
#[derive(Debug, Clone, Default)]
pub(crate) struct LineupsInfo {
    pub lineups: MatchLineups,
    pub warnings: Vec<String>,
}

/// Recognised position abbreviations; any other short cell value is
/// not a position.
const POSITIONS: [&str; 20] = [
    "GK", "DF", "MF", "FW", "CB", "LB", "RB", "WB", "LWB", "RWB", "DM", "CM", "AM", "LM", "RM",
    "LW", "RW", "CF", "ST", "SS",
];

const BENCH_LABELS: [&str; 3] = ["Bench", "Substitutes", "Subs"];

/// How many players a bench-heading sibling search may yield before
/// the container is rejected as wrongly identified.
const BENCH_POOL_BOUND: usize = 20;

pub(crate) fn extract_lineups(doc: &Html, header: &HeaderInfo) -> Result<LineupsInfo> {
    let mut info = LineupsInfo::default();

    extract_lineup_tables(doc, header, &mut info)?;
    extract_broad_containers(doc, header, &mut info)?;
    extract_bench_headings(doc, header, &mut info)?;

    debug!(
        home_xi = info.lineups.home.starting_xi.len(),
        home_bench = info.lineups.home.substitutes.len(),
        away_xi = info.lineups.away.starting_xi.len(),
        away_bench = info.lineups.away.substitutes.len(),
        "parsed lineups"
    );
    Ok(info)
}

fn bucket<'a>(lineups: &'a mut MatchLineups, side: Side) -> &'a mut TeamLineup {
    match side {
        Side::Home => &mut lineups.home,
        Side::Away => &mut lineups.away,
    }
}

fn contains_player(players: &[PlayerRef], candidate: &PlayerRef) -> bool {
    players.iter().any(|p| p.name == candidate.name)
}

fn push_unique(players: &mut Vec<PlayerRef>, candidate: PlayerRef) {
    if !contains_player(players, &candidate) {
        players.push(candidate);
    }
}

fn player_from_link(link: &ElementRef) -> Option<PlayerRef> {
    let name = link
        .text()
        .map(|t| t.trim())
        .find(|t| !t.is_empty())?
        .to_string();
    let site_id = link
        .value()
        .attr("href")
        .and_then(|href| fbref::site_id_from_href(href, "players"));
    Some(PlayerRef {
        name,
        site_id,
        ..PlayerRef::default()
    })
}

/// The side named by a container's text, when a scoreboard team name
/// appears in it.
fn named_side(text: &str, header: &HeaderInfo) -> Option<Side> {
    if team_names_match(&header.home.name, text)
        || text
            .split_whitespace()
            .any(|w| team_names_match(&header.home.name, w))
    {
        Some(Side::Home)
    } else if team_names_match(&header.away.name, text)
        || text
            .split_whitespace()
            .any(|w| team_names_match(&header.away.name, w))
    {
        Some(Side::Away)
    } else {
        None
    }
}

/// Which side a lineup container belongs to: a team-name mention wins,
/// otherwise the first container seen is home and the second away.
fn container_side(text: &str, header: &HeaderInfo, seen: usize) -> Side {
    named_side(text, header).unwrap_or(if seen == 0 { Side::Home } else { Side::Away })
}

/// Pass 1: dedicated lineup tables. Rows above the bench header are
/// starters, rows below are substitutes. Jersey number is any bare
/// integer cell in `[1, 99]`; position is any cell drawn from the
/// abbreviation set.
fn extract_lineup_tables(doc: &Html, header: &HeaderInfo, info: &mut LineupsInfo) -> Result<()> {
    let table_selector = Selector::parse("table[id*=\"lineup\"], table[class*=\"lineup\"]")?;
    let row_selector = Selector::parse("tr")?;
    let cell_selector = Selector::parse("th, td")?;
    let player_link_selector = Selector::parse("a[href*=\"/players/\"]")?;

    for (table_index, table) in doc.select(&table_selector).enumerate() {
        let header_text = table
            .select(&row_selector)
            .next()
            .map(|r| element_text(&r))
            .unwrap_or_default();
        let side = container_side(&header_text, header, table_index);

        let mut on_bench = false;
        for row in table.select(&row_selector) {
            let row_text = element_text(&row);
            if BENCH_LABELS
                .iter()
                .any(|label| row_text.trim().eq_ignore_ascii_case(label))
            {
                on_bench = true;
                continue;
            }
            let Some(mut player) = row
                .select(&player_link_selector)
                .next()
                .as_ref()
                .and_then(player_from_link)
            else {
                continue;
            };
            for cell in row.select(&cell_selector) {
                let text = element_text(&cell);
                let text = text.trim();
                if player.jersey_number.is_none() {
                    if let Ok(number) = text.parse::<u8>() {
                        if (1..=99).contains(&number) {
                            player.jersey_number = Some(number);
                            continue;
                        }
                    }
                }
                if player.position.is_none() && POSITIONS.contains(&text) {
                    player.position = Some(text.to_string());
                }
            }

            let lineup = bucket(&mut info.lineups, side);
            if on_bench {
                push_unique(&mut lineup.substitutes, player);
            } else {
                push_unique(&mut lineup.starting_xi, player);
            }
        }
    }
    Ok(())
}

/// Pass 2: broad containers whose text identifies one side's lineup
/// contribute their player links to that side's substitutes pool,
/// unless the player already starts. A container naming neither team
/// is skipped; any `lineup`-classed widget could match the selector.
fn extract_broad_containers(doc: &Html, header: &HeaderInfo, info: &mut LineupsInfo) -> Result<()> {
    let container_selector = Selector::parse("div[id*=\"lineup\"], div[class*=\"lineup\"]")?;
    let player_link_selector = Selector::parse("a[href*=\"/players/\"]")?;

    for container in doc.select(&container_selector) {
        let text = element_text(&container);
        let Some(side) = named_side(&text, header) else {
            continue;
        };
        let players = container
            .select(&player_link_selector)
            .filter_map(|link| player_from_link(&link))
            .collect_vec();

        let lineup = bucket(&mut info.lineups, side);
        for player in players {
            if !contains_player(&lineup.starting_xi, &player) {
                push_unique(&mut lineup.substitutes, player);
            }
        }
    }
    Ok(())
}

/// Pass 3: a "Bench" / "Substitutes" / "Subs" heading anchors a search
/// of the following sibling (or its immediate children) for player
/// links. Pools larger than [`BENCH_POOL_BOUND`] mean the container
/// was misidentified and are rejected.
fn extract_bench_headings(doc: &Html, header: &HeaderInfo, info: &mut LineupsInfo) -> Result<()> {
    let heading_selector = Selector::parse("h3, h4, strong, b, div, span")?;
    let player_link_selector = Selector::parse("a[href*=\"/players/\"]")?;

    let mut seen = 0usize;
    for heading in doc.select(&heading_selector) {
        let own_text: String = heading
            .text()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if !BENCH_LABELS
            .iter()
            .any(|label| own_text.eq_ignore_ascii_case(label))
        {
            continue;
        }
        let Some(sibling) = heading
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
        else {
            continue;
        };

        let pool = sibling
            .select(&player_link_selector)
            .filter_map(|link| player_from_link(&link))
            .collect_vec();
        if pool.is_empty() {
            continue;
        }
        if pool.len() > BENCH_POOL_BOUND {
            info.warnings.push(format!(
                "bench heading candidate pool of {} players rejected as misidentified",
                pool.len()
            ));
            continue;
        }

        // Side from the surrounding container text.
        let context = heading
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(4)
            .map(|a| element_text(&a))
            .join("\n");
        let side = container_side(&context, header, seen);
        seen += 1;

        let lineup = bucket(&mut info.lineups, side);
        for player in pool {
            if !contains_player(&lineup.starting_xi, &player) {
                push_unique(&mut lineup.substitutes, player);
            }
        }
    }
    Ok(())
}

/// Post-processing over the merged buckets, in this order: stats-backed substitute discovery, bench de-duplication against the
/// starting XI, XI truncation to 11, bench cap of 15 preferring
/// metadata-complete rows.
pub(crate) fn finalize_lineups(
    info: &mut LineupsInfo,
    player_stats: &MatchPlayerStats,
) {
    for (side, stats) in [(Side::Home, &player_stats.home), (Side::Away, &player_stats.away)] {
        let lineup = bucket(&mut info.lineups, side);

        // Anyone who played minutes but appears in no bucket came off
        // the bench.
        for row in stats {
            if row.minutes.unwrap_or(0) == 0 {
                continue;
            }
            if !contains_player(&lineup.starting_xi, &row.player)
                && !contains_player(&lineup.substitutes, &row.player)
            {
                lineup.substitutes.push(row.player.clone());
            }
        }

        let starters = lineup.starting_xi.clone();
        lineup
            .substitutes
            .retain(|p| !contains_player(&starters, p));

        if lineup.starting_xi.len() > 11 {
            info.warnings.push(format!(
                "{side} starting XI had {} rows; truncated to 11",
                lineup.starting_xi.len()
            ));
            lineup.starting_xi.truncate(11);
        }

        if lineup.substitutes.len() > 15 {
            // Keep metadata-complete rows first, preserving order
            // within each class.
            let complete = |p: &PlayerRef| {
                p.jersey_number.is_some() && p.position.is_some() && p.site_id.is_some()
            };
            let (keep, spill): (Vec<_>, Vec<_>) =
                lineup.substitutes.drain(..).partition(|p| complete(p));
            lineup.substitutes = keep.into_iter().chain(spill).take(15).collect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlayerMatchStats, TeamRef};

    fn header() -> HeaderInfo {
        HeaderInfo {
            home: TeamRef::named("Liverpool"),
            away: TeamRef::named("Bournemouth"),
            ..HeaderInfo::default()
        }
    }

    #[test]
    fn lineup_table_bench_flip() {
        let html = r#"<html><body>
            <table id="lineup_a">
            <tr><th colspan="3">Liverpool</th></tr>
            <tr><td>1</td><td>GK</td><td><a href="/en/players/aa11bb22/Alisson">Alisson</a></td></tr>
            <tr><td>4</td><td>CB</td><td><a href="/en/players/cc33dd44/Virgil-van-Dijk">Virgil van Dijk</a></td></tr>
            <tr><th colspan="3">Bench</th></tr>
            <tr><td>62</td><td>GK</td><td><a href="/en/players/ee55ff66/Caoimhin-Kelleher">Caoimhin Kelleher</a></td></tr>
            </table>
            </body></html>"#;
        let info = extract_lineups(&Html::parse_document(html), &header()).unwrap();

        let home = &info.lineups.home;
        assert_eq!(home.starting_xi.len(), 2);
        assert_eq!(home.starting_xi[0].name, "Alisson");
        assert_eq!(home.starting_xi[0].jersey_number, Some(1));
        assert_eq!(home.starting_xi[0].position.as_deref(), Some("GK"));
        assert_eq!(home.substitutes.len(), 1);
        assert_eq!(home.substitutes[0].name, "Caoimhin Kelleher");
        assert_eq!(home.substitutes[0].jersey_number, Some(62));
    }

    #[test]
    fn broad_container_must_name_a_team() {
        let html = r#"<html><body>
            <div class="lineup">
              <p>Bournemouth</p>
              <a href="/en/players/11aa22bb/Evanilson">Evanilson</a>
            </div>
            <div class="lineup_widget">
              <p>Players to watch this week</p>
              <a href="/en/players/99ff88ee/Erling-Haaland">Erling Haaland</a>
            </div>
            </body></html>"#;
        let info = extract_lineups(&Html::parse_document(html), &header()).unwrap();

        assert_eq!(info.lineups.away.substitutes.len(), 1);
        assert_eq!(info.lineups.away.substitutes[0].name, "Evanilson");
        assert!(
            info.lineups.home.substitutes.is_empty(),
            "unnamed widget must not bind to home"
        );
    }

    #[test]
    fn bench_heading_sibling_search() {
        let html = r#"<html><body>
            <div class="squad">
              <p>Bournemouth</p>
              <strong>Subs</strong>
              <ul>
                <li><a href="/en/players/11aa22bb/Evanilson">Evanilson</a></li>
                <li><a href="/en/players/33cc44dd/Lewis-Cook">Lewis Cook</a></li>
              </ul>
            </div>
            </body></html>"#;
        let info = extract_lineups(&Html::parse_document(html), &header()).unwrap();
        let away = &info.lineups.away;
        assert_eq!(away.substitutes.len(), 2);
        assert_eq!(away.substitutes[0].name, "Evanilson");
    }

    #[test]
    fn oversized_bench_pool_rejected() {
        let links: String = (0..25)
            .map(|i| format!("<a href=\"/en/players/{i:08}/P{i}\">Player {i}</a>"))
            .collect();
        let html = format!(
            "<html><body><div><strong>Bench</strong><div>{links}</div></div></body></html>"
        );
        let info = extract_lineups(&Html::parse_document(&html), &header()).unwrap();
        assert!(info.lineups.home.substitutes.is_empty());
        assert!(info.lineups.away.substitutes.is_empty());
        assert!(
            info.warnings.iter().any(|w| w.contains("rejected")),
            "expected rejection warning, got {:?}",
            info.warnings
        );
    }

    #[test]
    fn stats_backed_substitute_discovery() {
        let mut info = LineupsInfo::default();
        let stats = MatchPlayerStats {
            home: vec![
                PlayerMatchStats {
                    player: PlayerRef::named("Hugo Ekitike"),
                    minutes: Some(20),
                    ..PlayerMatchStats::default()
                },
                PlayerMatchStats {
                    player: PlayerRef::named("Unused Keeper"),
                    minutes: Some(0),
                    ..PlayerMatchStats::default()
                },
            ],
            away: vec![],
        };
        finalize_lineups(&mut info, &stats);

        assert_eq!(info.lineups.home.substitutes.len(), 1);
        assert_eq!(info.lineups.home.substitutes[0].name, "Hugo Ekitike");
    }

    #[test]
    fn bench_never_duplicates_starting_xi() {
        let mut info = LineupsInfo::default();
        info.lineups.home.starting_xi.push(PlayerRef::named("Mohamed Salah"));
        info.lineups.home.substitutes.push(PlayerRef::named("Mohamed Salah"));
        finalize_lineups(&mut info, &MatchPlayerStats::default());
        assert!(info.lineups.home.substitutes.is_empty());
    }

    #[test]
    fn starting_xi_truncated_with_warning() {
        let mut info = LineupsInfo::default();
        for i in 0..13 {
            info.lineups.home.starting_xi.push(PlayerRef::named(format!("P{i}")));
        }
        finalize_lineups(&mut info, &MatchPlayerStats::default());
        assert_eq!(info.lineups.home.starting_xi.len(), 11);
        assert!(info.warnings.iter().any(|w| w.contains("truncated")));
    }
}
