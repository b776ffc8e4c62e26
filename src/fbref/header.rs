use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::Result;
use crate::fbref::{self, element_text, find_score_pair, parse_int};
use crate::model::{Score, TeamRef};

/// Output of the header pass. The `home`/`away` refs carry the
/// authoritative site ids every other extractor uses to resolve sides.
#[derive(Debug, Clone, Default)]
pub(crate) struct HeaderInfo {
    pub home: TeamRef,
    pub away: TeamRef,
    pub date: Option<NaiveDate>,
    pub score: Option<Score>,
    pub venue: Option<String>,
    pub referee: Option<String>,
    pub attendance: Option<u32>,
    pub warnings: Vec<String>,
}

static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());
static TEXT_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        (?: (January|February|March|April|May|June|July|August|September|October|November|December)
            \s+ (\d{1,2}) ,? \s+ (\d{4}) )
        | (?: (\d{1,2}) \s+
            (January|February|March|April|May|June|July|August|September|October|November|December)
            \s+ (\d{4}) )",
    )
    .unwrap()
});
static MANAGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Manager[\s\n]*:[ \t]*([^\n]+)").unwrap());
static CAPTAIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Captain[\s\n]*:[ \t]*([^\n]+)").unwrap());
static VENUE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Venue[\s\n]*:[ \t]*([^\n]+)").unwrap());
static ATTENDANCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Attendance[\s\n]*:[ \t]*([\d,]+)").unwrap());
static REFEREE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:Referee[\s\n]*:[ \t]*([^\n(]+))|(?:([^\n(]+?)\s*\(\s*Referee\s*\))").unwrap()
});

/// Extract the match header: teams with site ids, score, date, venue,
/// referee, attendance, managers and captains.
///
/// `url` is the page the DOM was loaded from, used as a date source of
/// last resort before the body text. `expected_home`/`expected_away`
/// are only a naming fallback when the page yields no team links.
pub(crate) fn extract_header(
    doc: &Html,
    url: &str,
    expected_home: &str,
    expected_away: &str,
) -> Result<HeaderInfo> {
    let mut info = HeaderInfo::default();
    let page_text = element_text(&doc.root_element());

    extract_teams(doc, expected_home, expected_away, &mut info)?;
    info.score = extract_score(doc, &page_text)?;
    info.date = extract_date(doc, url, &page_text)?;

    info.venue = VENUE_RE
        .captures(&page_text)
        .map(|c| c[1].trim().to_string());
    info.referee = REFEREE_RE.captures(&page_text).and_then(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .map(|m| m.as_str().trim().to_string())
    });
    info.attendance = ATTENDANCE_RE
        .captures(&page_text)
        .and_then(|c| parse_int(&c[1]));

    let managers = two_labelled_values(&MANAGER_RE, &page_text);
    bind_pair(managers, "manager", &mut info, |team, v| {
        team.manager = Some(v)
    });
    let captains = two_labelled_values(&CAPTAIN_RE, &page_text);
    bind_pair(captains, "captain", &mut info, |team, v| {
        team.captain = Some(v)
    });

    debug!(
        home = %info.home.name,
        away = %info.away.name,
        score = ?info.score,
        date = ?info.date,
        "parsed match header"
    );
    Ok(info)
}

/// The scoreboard block is authoritative: its first named region is
/// always home, the second always away. Fall back to the first two
/// squad links on the page, then to the caller-supplied names.
fn extract_teams(
    doc: &Html,
    expected_home: &str,
    expected_away: &str,
    info: &mut HeaderInfo,
) -> Result<()> {
    let scorebox_link_selector = Selector::parse("div.scorebox a[href*=\"/squads/\"]")?;
    let any_link_selector = Selector::parse("a[href*=\"/squads/\"]")?;

    let mut links = doc.select(&scorebox_link_selector).collect_vec();
    if links.len() < 2 {
        links = doc.select(&any_link_selector).collect_vec();
    }

    let team_from_link = |link: &ElementRef| -> Option<TeamRef> {
        let name = link
            .text()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())?
            .to_string();
        let site_id = link
            .value()
            .attr("href")
            .and_then(|href| fbref::site_id_from_href(href, "squads"));
        Some(TeamRef {
            name,
            site_id,
            ..TeamRef::default()
        })
    };

    // Distinct ids only: the page repeats each squad link many times.
    let mut teams: Vec<TeamRef> = Vec::new();
    for link in &links {
        if let Some(team) = team_from_link(link) {
            if !teams
                .iter()
                .any(|t| t.site_id.is_some() && t.site_id == team.site_id)
            {
                teams.push(team);
            }
        }
        if teams.len() == 2 {
            break;
        }
    }

    match (teams.first().cloned(), teams.get(1).cloned()) {
        (Some(home), Some(away)) => {
            info.home = home;
            info.away = away;
        }
        _ => {
            info.home = TeamRef::named(expected_home);
            info.away = TeamRef::named(expected_away);
            info.warnings
                .push("no squad links found; team names taken from caller".to_string());
        }
    }
    Ok(())
}

/// Four strategies, strictest first. Each candidate pair must pass
/// [`Score`] validation; the first pair where both components pass
/// wins. Jersey numbers, dates, and years fail validation and fall
/// through to the next strategy.
fn extract_score(doc: &Html, page_text: &str) -> Result<Option<Score>> {
    let scorebox_selector = Selector::parse("div.scorebox")?;
    let region_score_selector = Selector::parse("div.score")?;
    let loose_score_selector = Selector::parse("[class*=\"score\"]")?;

    if let Some(scorebox) = doc.select(&scorebox_selector).next() {
        // 1. The dedicated score element of each team region.
        let texts = scorebox
            .select(&region_score_selector)
            .map(|e| element_text(&e))
            .collect_vec();
        if texts.len() >= 2 {
            if let Some(score) = Score::from_components(&texts[0], &texts[1]) {
                return Ok(Some(score));
            }
        }

        // 2. Any pair of score-classed elements inside the scoreboard.
        let candidates = scorebox
            .select(&loose_score_selector)
            .map(|e| element_text(&e))
            .collect_vec();
        for pair in candidates.windows(2) {
            if let Some(score) = Score::from_components(&pair[0], &pair[1]) {
                return Ok(Some(score));
            }
        }

        // 3. A validated two-integer pattern in the scoreboard text.
        if let Some(score) = find_score_pair(&element_text(&scorebox)) {
            return Ok(Some(score));
        }
    }

    // 4. A validated two-integer pattern anywhere on the page.
    Ok(find_score_pair(page_text))
}

/// Date sources in order: semantic markup, page title, the URL path,
/// the body text. ISO, "Month D, YYYY", and "D Month YYYY" all parse.
fn extract_date(doc: &Html, url: &str, page_text: &str) -> Result<Option<NaiveDate>> {
    let venue_date_selector = Selector::parse("[data-venue-date]")?;
    if let Some(date) = doc
        .select(&venue_date_selector)
        .filter_map(|e| e.value().attr("data-venue-date"))
        .find_map(parse_date_text)
    {
        return Ok(Some(date));
    }

    let title_selector = Selector::parse("title")?;
    if let Some(date) = doc
        .select(&title_selector)
        .next()
        .map(|e| element_text(&e))
        .and_then(|t| parse_date_text(&t))
    {
        return Ok(Some(date));
    }

    // Match URLs embed the date either ISO (`/matches/2024-08-17`) or
    // hyphenated (`Liverpool-Bournemouth-August-17-2024`).
    let path = url.split('?').next().unwrap_or(url);
    if let Some(date) = parse_date_text(path).or_else(|| parse_date_text(&path.replace('-', " ")))
    {
        return Ok(Some(date));
    }

    Ok(parse_date_text(page_text))
}

/// Find a date in free text, trying ISO first, then both textual
/// month forms.
pub(crate) fn parse_date_text(text: &str) -> Option<NaiveDate> {
    if let Some(m) = ISO_DATE_RE.find(text) {
        if let Ok(date) = NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d") {
            return Some(date);
        }
    }
    let caps = TEXT_DATE_RE.captures(text)?;
    let (month, day, year) = if caps.get(1).is_some() {
        (&caps[1], &caps[2], &caps[3])
    } else {
        (&caps[5], &caps[4], &caps[6])
    };
    NaiveDate::parse_from_str(&format!("{day} {month} {year}"), "%d %B %Y").ok()
}

/// Collect up to two labelled occurrences in text order.
fn two_labelled_values(re: &Regex, page_text: &str) -> Vec<String> {
    re.captures_iter(page_text)
        .map(|c| c[1].trim().to_string())
        .filter(|v| !v.is_empty())
        .take(2)
        .collect()
}

/// Bind a two-of-each field (managers, captains): first occurrence in
/// text order is home, second away. With a single occurrence the
/// original layout used viewport geometry; here it binds to home and
/// the record carries an audit warning instead.
fn bind_pair(
    values: Vec<String>,
    label: &str,
    info: &mut HeaderInfo,
    set: impl Fn(&mut TeamRef, String),
) {
    match values.len() {
        2 => {
            let mut it = values.into_iter();
            set(&mut info.home, it.next().unwrap_or_default());
            set(&mut info.away, it.next().unwrap_or_default());
        }
        1 => {
            let value = values.into_iter().next().unwrap_or_default();
            info.warnings.push(format!(
                "single {label} occurrence '{value}' bound to home side by position heuristic"
            ));
            set(&mut info.home, value);
        }
        _ => {}
    }
}
