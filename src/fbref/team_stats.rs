use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::Result;
use crate::fbref::{element_text, parse_int, parse_of_triple, team_names_match};
use crate::fbref::header::HeaderInfo;
use crate::model::{MatchTeamStats, TeamMatchStats};

#[derive(Debug, Clone, Default)]
pub(crate) struct TeamStatsInfo {
    pub stats: MatchTeamStats,
    pub warnings: Vec<String>,
}

/// Extract the aggregate per-side statistics table.
///
/// The table alternates between a stat-name row and a two-cell values
/// row; its header row names the two teams and decides which column is
/// home. Every field fails independently: an unparseable value leaves
/// only its own field absent.
pub(crate) fn extract_team_stats(doc: &Html, header: &HeaderInfo) -> Result<TeamStatsInfo> {
    let mut info = TeamStatsInfo::default();
    let table_selector =
        Selector::parse("#team_stats table, table#team_stats, [class*=\"team_stats\"] table")?;
    let row_selector = Selector::parse("tr")?;
    let cell_selector = Selector::parse("th, td")?;

    let Some(table) = doc.select(&table_selector).next() else {
        return Ok(info);
    };

    let mut swapped = false;
    let mut oriented = false;
    let mut pending_stat: Option<String> = None;

    for row in table.select(&row_selector) {
        let cells = row.select(&cell_selector).collect_vec();
        match cells.len() {
            1 => {
                pending_stat = Some(element_text(&cells[0]).trim().to_lowercase());
            }
            2 => {
                let left = element_text(&cells[0]);
                let right = element_text(&cells[1]);
                if !oriented
                    && team_names_match(&header.home.name, &left)
                    && team_names_match(&header.away.name, &right)
                {
                    oriented = true;
                } else if !oriented
                    && team_names_match(&header.away.name, &left)
                    && team_names_match(&header.home.name, &right)
                {
                    oriented = true;
                    swapped = true;
                } else if let Some(stat) = pending_stat.take() {
                    let (home_cell, away_cell) = if swapped {
                        (&cells[1], &cells[0])
                    } else {
                        (&cells[0], &cells[1])
                    };
                    apply_stat(&stat, home_cell, &mut info.stats.home);
                    apply_stat(&stat, away_cell, &mut info.stats.away);
                }
            }
            _ => {}
        }
    }

    if !oriented && table.select(&row_selector).next().is_some() {
        info.warnings.push(
            "team stats table has no recognisable team header; assumed column 1 is home"
                .to_string(),
        );
    }
    debug!(?info.stats.home.possession_pct, ?info.stats.away.possession_pct, "parsed team stats");
    Ok(info)
}

/// Substring-based stat-name dispatch. The more specific patterns
/// ("shots on target", card colours) are checked before the generic
/// ones they contain.
fn apply_stat(name: &str, cell: &ElementRef, stats: &mut TeamMatchStats) {
    let text = element_text(cell);
    let int = || parse_int(&text).and_then(|v| u16::try_from(v).ok());

    if name.contains("possession") {
        stats.possession_pct = parse_int(&text).map(|v| v as f32);
    } else if name.contains("passing") {
        stats.passing_accuracy = parse_of_triple(&text);
    } else if name.contains("shot") && name.contains("target") {
        stats.shots_on_target = parse_of_triple(&text);
    } else if name.contains("shot") {
        stats.shots = int();
    } else if name.contains("save") {
        stats.saves = parse_of_triple(&text);
    } else if name.contains("yellow card") {
        stats.yellow_cards = int();
    } else if name.contains("red card") {
        stats.red_cards = int();
    } else if name.contains("card") {
        // A bare "Cards" row renders icons rather than numbers.
        let (yellow, red) = count_card_icons(cell);
        if yellow > 0 {
            stats.yellow_cards = Some(yellow);
        }
        if red > 0 {
            stats.red_cards = Some(red);
        }
    } else if name.contains("foul") {
        stats.fouls = int();
    } else if name.contains("corner") {
        stats.corners = int();
    } else if name.contains("cross") {
        stats.crosses = int();
    } else if name.contains("touch") {
        stats.touches = int();
    } else if name.contains("tackle") {
        stats.tackles = int();
    } else if name.contains("interception") {
        stats.interceptions = int();
    } else if name.contains("aerial") {
        stats.aerials_won = int();
    } else if name.contains("clearance") {
        stats.clearances = int();
    } else if name.contains("offside") {
        stats.offsides = int();
    } else if name.contains("goal kick") {
        stats.goal_kicks = int();
    } else if name.contains("throw in") || name.contains("throw-in") {
        stats.throw_ins = int();
    } else if name.contains("long ball") {
        stats.long_balls = int();
    }
}

static YELLOW_ICON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[class*=\"yellow_card\"]").unwrap());
static RED_ICON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[class*=\"red_card\"]").unwrap());

fn count_card_icons(cell: &ElementRef) -> (u16, u16) {
    // "yellow_red_card" icons (second yellow) count as red.
    let yellow = cell
        .select(&YELLOW_ICON_SELECTOR)
        .filter(|e| {
            !e.value()
                .classes()
                .any(|c| c.contains("yellow_red_card"))
        })
        .count() as u16;
    let red = cell.select(&RED_ICON_SELECTOR).count() as u16;
    (yellow, red)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TeamRef;

    fn header() -> HeaderInfo {
        HeaderInfo {
            home: TeamRef::named("Liverpool"),
            away: TeamRef::named("Bournemouth"),
            ..HeaderInfo::default()
        }
    }

    fn table(rows: &str) -> String {
        format!(
            r#"<html><body><div id="team_stats"><table>
            <tr><th>Liverpool</th><th>Bournemouth</th></tr>
            {rows}
            </table></div></body></html>"#
        )
    }

    #[test]
    fn possession_and_passing_triples() {
        let html = table(
            r#"<tr><th colspan="2">Possession</th></tr>
            <tr><td>61%</td><td>39%</td></tr>
            <tr><th colspan="2">Passing Accuracy</th></tr>
            <tr><td>430 of 539 — 80%</td><td>72% — 164 of 228</td></tr>"#,
        );
        let info = extract_team_stats(&Html::parse_document(&html), &header()).unwrap();

        assert_eq!(info.stats.home.possession_pct, Some(61.0));
        assert_eq!(info.stats.away.possession_pct, Some(39.0));
        let home = info.stats.home.passing_accuracy.expect("home triple");
        assert_eq!((home.completed, home.attempted, home.pct), (430, 539, 80.0));
        let away = info.stats.away.passing_accuracy.expect("away triple");
        assert_eq!((away.completed, away.attempted, away.pct), (164, 228, 72.0));
    }

    #[test]
    fn swapped_columns_follow_the_header() {
        let html = r#"<html><body><div id="team_stats"><table>
            <tr><th>Bournemouth</th><th>Liverpool</th></tr>
            <tr><th colspan="2">Fouls</th></tr>
            <tr><td>14</td><td>9</td></tr>
            </table></div></body></html>"#;
        let info = extract_team_stats(&Html::parse_document(html), &header()).unwrap();
        assert_eq!(info.stats.home.fouls, Some(9));
        assert_eq!(info.stats.away.fouls, Some(14));
    }

    #[test]
    fn independent_field_failure() {
        let html = table(
            r#"<tr><th colspan="2">Corners</th></tr>
            <tr><td>7</td><td>—</td></tr>
            <tr><th colspan="2">Offsides</th></tr>
            <tr><td>2</td><td>3</td></tr>"#,
        );
        let info = extract_team_stats(&Html::parse_document(&html), &header()).unwrap();
        assert_eq!(info.stats.home.corners, Some(7));
        assert_eq!(
            info.stats.away.corners, None,
            "unparseable value stays absent, never zero or the other side's value"
        );
        assert_eq!(info.stats.away.offsides, Some(3));
    }

    #[test]
    fn card_icons_fallback() {
        let html = table(
            r#"<tr><th colspan="2">Cards</th></tr>
            <tr>
              <td><span class="yellow_card"></span><span class="yellow_card"></span></td>
              <td><span class="yellow_card"></span><span class="red_card"></span></td>
            </tr>"#,
        );
        let info = extract_team_stats(&Html::parse_document(&html), &header()).unwrap();
        assert_eq!(info.stats.home.yellow_cards, Some(2));
        assert_eq!(info.stats.home.red_cards, None);
        assert_eq!(info.stats.away.yellow_cards, Some(1));
        assert_eq!(info.stats.away.red_cards, Some(1));
    }

    #[test]
    fn full_stat_name_map() {
        let html = table(
            r#"<tr><th colspan="2">Shots on Target</th></tr>
            <tr><td>5 of 13 — 38%</td><td>2 of 7 — 29%</td></tr>
            <tr><th colspan="2">Shots</th></tr>
            <tr><td>13</td><td>7</td></tr>
            <tr><th colspan="2">Saves</th></tr>
            <tr><td>1 of 2 — 50%</td><td>4 of 5 — 80%</td></tr>
            <tr><th colspan="2">Touches</th></tr>
            <tr><td>701</td><td>455</td></tr>
            <tr><th colspan="2">Tackles</th></tr>
            <tr><td>11</td><td>19</td></tr>
            <tr><th colspan="2">Interceptions</th></tr>
            <tr><td>8</td><td>10</td></tr>
            <tr><th colspan="2">Aerials Won</th></tr>
            <tr><td>12</td><td>15</td></tr>
            <tr><th colspan="2">Clearances</th></tr>
            <tr><td>16</td><td>29</td></tr>
            <tr><th colspan="2">Goal Kicks</th></tr>
            <tr><td>6</td><td>9</td></tr>
            <tr><th colspan="2">Throw Ins</th></tr>
            <tr><td>21</td><td>17</td></tr>
            <tr><th colspan="2">Long Balls</th></tr>
            <tr><td>38</td><td>52</td></tr>
            <tr><th colspan="2">Crosses</th></tr>
            <tr><td>24</td><td>8</td></tr>"#,
        );
        let info = extract_team_stats(&Html::parse_document(&html), &header()).unwrap();
        let home = &info.stats.home;
        assert_eq!(home.shots, Some(13));
        assert_eq!(home.shots_on_target.unwrap().completed, 5);
        assert_eq!(home.saves.unwrap().pct, 50.0);
        assert_eq!(home.touches, Some(701));
        assert_eq!(home.tackles, Some(11));
        assert_eq!(home.interceptions, Some(8));
        assert_eq!(home.aerials_won, Some(12));
        assert_eq!(home.clearances, Some(16));
        assert_eq!(home.goal_kicks, Some(6));
        assert_eq!(home.throw_ins, Some(21));
        assert_eq!(home.long_balls, Some(38));
        assert_eq!(home.crosses, Some(24));
        assert_eq!(info.stats.away.long_balls, Some(52));
    }
}
