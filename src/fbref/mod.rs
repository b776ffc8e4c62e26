pub(crate) mod assemble;
pub(crate) mod events;
pub(crate) mod header;
pub(crate) mod lineups;
pub(crate) mod navigate;
pub(crate) mod player_stats;
pub(crate) mod team_stats;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};

use crate::model::{Minute, Score, StatTriple};

pub(crate) const BASE_URL: &str = "https://fbref.com";

/// All regexes used by the extractors live here; the extractors
/// themselves only call the helpers below.
static MINUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,3})(?:\s*\+\s*(\d{1,2}))?\s*['’]?\s*$").unwrap());
static SCORE_PAIR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*[–—:-]\s*(\d+)").unwrap());
static OF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s+of\s+(\d+)").unwrap());
static PCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").unwrap());
static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d[\d,]*").unwrap());

/// Extract trimmed text content from the first element matching
/// `selector` inside `element`. Returns an empty string if nothing
/// matches.
pub(crate) fn select_text(element: &ElementRef, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .and_then(|d| d.text().map(|t| t.trim()).find(|t| !t.is_empty()))
        .unwrap_or_default()
        .trim()
        .replace(['\n', '\t'], "")
        .to_string()
}

/// Full text of an element with node boundaries preserved as newlines.
pub(crate) fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a match minute, accepting `73`, `73'`, and `90+4` forms.
/// The added form is only valid at a period end (45, 90, 105, 120).
pub(crate) fn parse_minute(text: &str) -> Option<Minute> {
    let caps = MINUTE_RE.captures(text)?;
    let base: u8 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2) {
        Some(added) => Minute::added(base, added.as_str().parse().ok()?),
        None => Minute::whole(base),
    }
}

/// Scan free text for the first two-integer pair where both components
/// pass [`Score`] validation. Date-like runs (`2025-8`) fail because
/// the whole digit run is matched and `2025` is not a valid component.
pub(crate) fn find_score_pair(text: &str) -> Option<Score> {
    SCORE_PAIR_RE
        .captures_iter(text)
        .find_map(|caps| Score::from_components(&caps[1], &caps[2]))
}

/// Parse an `"X of Y (Z%)"` statistic in either order
/// (`"430 of 539 — 80%"` or `"72% — 164 of 228"`). All three values
/// must be present, `X <= Y` must hold, and the percentage must agree
/// with `X / Y` within one point, otherwise the triple is absent as a
/// whole.
pub(crate) fn parse_of_triple(text: &str) -> Option<StatTriple> {
    let of = OF_RE.captures(text)?;
    let completed: u16 = of[1].parse().ok()?;
    let attempted: u16 = of[2].parse().ok()?;
    if completed > attempted {
        return None;
    }
    let pct: f32 = PCT_RE.captures(text)?[1].parse().ok()?;
    if attempted > 0 {
        let derived = f32::from(completed) / f32::from(attempted) * 100.0;
        if (derived.round() - pct.round()).abs() > 1.0 {
            return None;
        }
    }
    Some(StatTriple {
        completed,
        attempted,
        pct,
    })
}

/// First bare integer in a cell, tolerating thousands separators
/// (`"53,000"`) and a trailing `%`.
pub(crate) fn parse_int(text: &str) -> Option<u32> {
    INT_RE.find(text)?.as_str().replace(',', "").parse().ok()
}

/// Normalise a team name the way fbref builds its URL slugs:
/// lower-case, apostrophes removed, spaces replaced by hyphens.
pub(crate) fn normalize_team_name(name: &str) -> String {
    name.to_lowercase()
        .replace(['\'', '\u{2019}'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// Bidirectional containment match between two normalised team names,
/// so "Wolves" matches "Wolverhampton-Wanderers" href slugs and vice
/// versa.
pub(crate) fn team_names_match(expected: &str, candidate: &str) -> bool {
    let e = normalize_team_name(expected);
    let c = normalize_team_name(candidate);
    !e.is_empty() && !c.is_empty() && (c.contains(&e) || e.contains(&c))
}

/// Pull the 8-hex site id out of an fbref entity href, e.g.
/// `/en/squads/822bd0ba/Liverpool-Stats` or
/// `/en/players/e342ad68/Mohamed-Salah`.
pub(crate) fn site_id_from_href(href: &str, entity: &str) -> Option<String> {
    let marker = format!("/{entity}/");
    let rest = &href[href.find(&marker)? + marker.len()..];
    let id = rest.split('/').next()?;
    crate::model::is_valid_site_id(id).then(|| id.to_string())
}

/// True when `url` is inside the fbref origin. The upstream has been
/// observed to redirect misconfigured requests to an unrelated search
/// page, which must be treated as a navigation failure.
pub(crate) fn is_fbref_origin(url: &str) -> bool {
    let host = url
        .split("://")
        .nth(1)
        .unwrap_or(url)
        .split('/')
        .next()
        .unwrap_or_default();
    host == "fbref.com" || host.ends_with(".fbref.com")
}
