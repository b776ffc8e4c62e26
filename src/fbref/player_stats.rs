use itertools::Itertools;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::Result;
use crate::fbref::{self, element_text};
use crate::fbref::header::HeaderInfo;
use crate::model::{MatchPlayerStats, PlayerMatchStats, PlayerRef, Side};

#[derive(Debug, Clone, Default)]
pub(crate) struct PlayerStatsInfo {
    pub stats: MatchPlayerStats,
    pub warnings: Vec<String>,
}

/// Header labels that only appear in the advanced-metrics tables
/// (expected goals, shot/goal-creating actions, carries, take-ons).
const ADVANCED_MARKERS: [&str; 6] = ["xg", "npxg", "xag", "sca", "gca", "carries"];

/// Header labels that only appear in the goalkeeping tables.
const KEEPER_MARKERS: [&str; 4] = ["sota", "saves", "save%", "psxg"];

/// A summary table must have this many header columns to be the real
/// thing; the passing/defense detail tables are narrower.
const MIN_SUMMARY_COLUMNS: usize = 15;

/// Extract per-player match stats from the per-team summary tables.
///
/// Each team has several stats tables (summary, passing, defense,
/// goalkeeping, advanced); only the summary tables qualify: header
/// includes "Min", has "Gls" or "Ast", is wide enough, and carries no
/// advanced-only or goalkeeper-only markers.
pub(crate) fn extract_player_stats(doc: &Html, header: &HeaderInfo) -> Result<PlayerStatsInfo> {
    let mut info = PlayerStatsInfo::default();
    let table_selector = Selector::parse("table")?;
    let header_row_selector = Selector::parse("tr")?;
    let header_cell_selector = Selector::parse("th")?;

    let mut unassigned = 0usize;
    for table in doc.select(&table_selector) {
        let Some(labels) = table
            .select(&header_row_selector)
            .map(|row| {
                row.select(&header_cell_selector)
                    .map(|c| element_text(&c).to_lowercase())
                    .collect_vec()
            })
            .find(|labels| labels.iter().any(|l| l == "min"))
        else {
            continue;
        };
        if !is_summary_header(&labels) {
            continue;
        }

        let table_team_id = table
            .value()
            .attr("id")
            .and_then(|id| id.split('_').find(|seg| crate::model::is_valid_site_id(seg)));
        let side = match table_team_id {
            Some(id) if header.home.site_id.as_deref() == Some(id) => Side::Home,
            Some(id) if header.away.site_id.as_deref() == Some(id) => Side::Away,
            _ => {
                // Without a usable team id, fall back to document
                // order: home table first.
                let side = if unassigned == 0 { Side::Home } else { Side::Away };
                unassigned += 1;
                side
            }
        };

        let rows = parse_summary_table(&table, &labels)?;
        match side {
            Side::Home => info.stats.home.extend(rows),
            Side::Away => info.stats.away.extend(rows),
        }
    }

    debug!(
        home_rows = info.stats.home.len(),
        away_rows = info.stats.away.len(),
        "parsed player stats"
    );
    Ok(info)
}

fn is_summary_header(labels: &[String]) -> bool {
    let has = |l: &str| labels.iter().any(|x| x == l);
    has("min")
        && (has("gls") || has("ast"))
        && labels.len() > MIN_SUMMARY_COLUMNS
        && !labels
            .iter()
            .any(|l| ADVANCED_MARKERS.contains(&l.as_str()) || KEEPER_MARKERS.contains(&l.as_str()))
}

/// Parse one summary table. The player name lives in the row's header
/// cell; the data cells align with the header columns offset by one,
/// because the header's column zero is the player itself.
fn parse_summary_table(table: &ElementRef, labels: &[String]) -> Result<Vec<PlayerMatchStats>> {
    let row_selector = Selector::parse("tbody tr")?;
    let name_cell_selector = Selector::parse("th")?;
    let player_link_selector = Selector::parse("a[href*=\"/players/\"]")?;
    let data_cell_selector = Selector::parse("td")?;

    // The "Att" column is passes-attempted only when a "Cmp" header
    // sits within three columns of it; other table sections reuse the
    // label for dribbles and long balls.
    let cmp_index = labels.iter().position(|l| l == "cmp");
    let att_is_passes = |i: usize| {
        cmp_index.is_some_and(|c| i.abs_diff(c) <= 3)
    };

    let mut rows = Vec::new();
    for row in table.select(&row_selector) {
        let Some(name_cell) = row.select(&name_cell_selector).next() else {
            continue;
        };
        let Some(link) = name_cell.select(&player_link_selector).next() else {
            continue;
        };
        let mut player = PlayerRef::named(
            link.text()
                .map(|t| t.trim())
                .find(|t| !t.is_empty())
                .unwrap_or_default(),
        );
        if player.name.is_empty() {
            continue;
        }
        player.site_id = link
            .value()
            .attr("href")
            .and_then(|href| fbref::site_id_from_href(href, "players"));

        let cells = row.select(&data_cell_selector).collect_vec();
        let cell_text = |header_index: usize| -> Option<String> {
            // Header index i maps to data index i-1.
            let text = element_text(cells.get(header_index.checked_sub(1)?)?);
            let text = text.trim().to_string();
            (!text.is_empty()).then_some(text)
        };

        let mut stats = PlayerMatchStats::default();
        let mut yellows = 0u8;
        let mut reds = 0u8;
        let mut cmp_fallback: Option<u16> = None;
        for (i, label) in labels.iter().enumerate().skip(1) {
            let Some(text) = cell_text(i) else { continue };
            match label.as_str() {
                "#" => {
                    player.jersey_number = text
                        .parse::<u8>()
                        .ok()
                        .filter(|n| (1..=99).contains(n));
                }
                "pos" => player.position = Some(text),
                "min" => {
                    // A 90+ literal truncates to its base.
                    stats.minutes = text
                        .trim_end_matches('+')
                        .parse::<u8>()
                        .ok()
                        .or_else(|| fbref::parse_minute(&text).map(|m| m.base()));
                }
                "gls" => stats.goals = text.parse().ok(),
                "ast" => stats.assists = text.parse().ok(),
                "sh" => stats.shots = text.parse().ok(),
                "sot" => stats.shots_on_target = text.parse().ok(),
                "att" if att_is_passes(i) => {
                    // Guard against a sparse row where the only filled
                    // value is the 90 in the minutes column.
                    if stats.minutes.is_some() {
                        stats.passes_attempted = text.parse().ok();
                    }
                }
                "cmp" => cmp_fallback = text.parse().ok(),
                "cmp%" => stats.pass_accuracy_pct = text.parse().ok(),
                "tkl" => stats.tackles = text.parse().ok(),
                "int" => stats.interceptions = text.parse().ok(),
                "fls" => stats.fouls = text.parse().ok(),
                "crdy" => yellows = text.parse().unwrap_or(0),
                "crdr" => reds = text.parse().unwrap_or(0),
                _ => {}
            }
        }
        if stats.passes_attempted.is_none() && stats.minutes.is_some() {
            stats.passes_attempted = cmp_fallback;
        }
        if yellows > 0 || reds > 0 {
            stats.cards = Some("Y".repeat(yellows as usize) + &"R".repeat(reds as usize));
        }
        stats.player = player;
        rows.push(stats);
    }
    Ok(rows)
}
