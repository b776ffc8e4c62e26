use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::error::{FbrefError, Result};
use crate::fbref::{self, normalize_team_name, BASE_URL};
use crate::session::Session;

/// URL shapes like `/en/matches/2024-08-17` list every fixture played
/// on that day rather than a single report.
static DATE_PATH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/matches/\d{4}-\d{2}-\d{2}/?$").unwrap());

/// Tokens that mark a women's or youth fixture in a match href.
const EXCLUDED_HREF_TOKENS: [&str; 5] = ["women", "u21", "u18", "u23", "youth"];

const COMPETITION_HREF_TOKEN: &str = "premier-league";

/// How long to wait out a challenge interstitial. A headed session is
/// interactive and gets the long budget; headless cannot be helped.
const HEADED_WAIT_SECS: u64 = 180;
const HEADLESS_WAIT_SECS: u64 = 20;

/// Load `url` and resolve it to the canonical match-report DOM for
/// `expected_home` vs `expected_away`.
///
/// A date-index page is resolved to the one Premier League link naming
/// both teams; a page with a distinct "Match Report" link is followed
/// to it. Returns the parsed report DOM.
pub(crate) fn resolve_match_report(
    session: &Session,
    url: &str,
    expected_home: &str,
    expected_away: &str,
) -> Result<Html> {
    open_and_wait(session, url)?;
    let mut doc = session.source()?;
    let mut current = session.current_url();

    if let Some(href) = pick_date_index_link(&doc, &current, expected_home, expected_away)? {
        let target = absolute_url(&href);
        info!(target, "date index resolved to match link");
        open_and_wait(session, &target)?;
        doc = session.source()?;
        current = session.current_url();
    } else if is_date_index(&doc, &current)? {
        return Err(FbrefError::MatchNotFound {
            url: current,
            home: expected_home.to_string(),
            away: expected_away.to_string(),
        });
    }

    if let Some(href) = match_report_link(&doc, &current)? {
        let target = absolute_url(&href);
        debug!(target, "following Match Report link");
        open_and_wait(session, &target)?;
        doc = session.source()?;
    }
    Ok(doc)
}

fn open_and_wait(session: &Session, url: &str) -> Result<()> {
    session.open(url)?;
    let budget = if session.is_headless() {
        HEADLESS_WAIT_SECS
    } else {
        HEADED_WAIT_SECS
    };
    if !session.wait_for_access(budget) {
        return Err(FbrefError::ChallengeTimeout {
            url: url.to_string(),
            waited_secs: budget,
        });
    }
    Ok(())
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("{BASE_URL}{href}")
    }
}

fn match_links(doc: &Html) -> Result<Vec<String>> {
    let link_selector = Selector::parse("a[href*=\"/matches/\"]")?;
    Ok(doc
        .select(&link_selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| !DATE_PATH_RE.is_match(href))
        .map(str::to_string)
        .collect_vec())
}

/// A page is a date index when its URL has the date-only shape and it
/// links to more than one match page.
fn is_date_index(doc: &Html, url: &str) -> Result<bool> {
    let path = url.split('?').next().unwrap_or(url);
    Ok(DATE_PATH_RE.is_match(path) && match_links(doc)?.len() > 1)
}

/// On a date index, pick the href naming both expected teams that is
/// not a women's or youth fixture, preferring one annotated with the
/// competition name. `Ok(None)` when the page is not a date index at
/// all; [`FbrefError::MatchNotFound`] surfaces in the caller when it
/// is one but no link qualifies.
pub(crate) fn pick_date_index_link(
    doc: &Html,
    url: &str,
    expected_home: &str,
    expected_away: &str,
) -> Result<Option<String>> {
    if !is_date_index(doc, url)? {
        return Ok(None);
    }
    let home = normalize_team_name(expected_home);
    let away = normalize_team_name(expected_away);

    let candidates = match_links(doc)?
        .into_iter()
        .filter(|href| {
            let normalized = href.to_lowercase().replace(['\'', '\u{2019}'], "");
            normalized.contains(&home)
                && normalized.contains(&away)
                && !EXCLUDED_HREF_TOKENS
                    .iter()
                    .any(|token| normalized.contains(token))
        })
        .collect_vec();

    Ok(candidates
        .iter()
        .find(|href| href.to_lowercase().contains(COMPETITION_HREF_TOKEN))
        .or_else(|| candidates.first())
        .cloned())
}

/// A "Match Report" link that differs from the current page means we
/// are on a preview/summary page and the full report lives elsewhere.
pub(crate) fn match_report_link(doc: &Html, current_url: &str) -> Result<Option<String>> {
    let link_selector = Selector::parse("a")?;
    let current_path = current_url
        .split("://")
        .nth(1)
        .and_then(|rest| rest.find('/').map(|i| &rest[i..]))
        .unwrap_or(current_url);

    for link in doc.select(&link_selector) {
        let text = fbref::element_text(&link);
        if !text.trim().eq_ignore_ascii_case("match report") {
            continue;
        }
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if href != current_path && !current_url.ends_with(href) {
            return Ok(Some(href.to_string()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE_INDEX: &str = r#"<html><body>
        <a href="/en/matches/9e2b7a3f/Liverpool-Bournemouth-August-17-2024-Premier-League">Liverpool vs Bournemouth</a>
        <a href="/en/matches/77ddee11/Liverpool-Bournemouth-August-17-2024-Womens-Super-League-Women">Liverpool vs Bournemouth (W)</a>
        <a href="/en/matches/55ccdd22/Arsenal-Chelsea-August-17-2024-Premier-League">Arsenal vs Chelsea</a>
        </body></html>"#;

    #[test]
    fn date_index_picks_the_right_fixture() {
        let doc = Html::parse_document(DATE_INDEX);
        let href = pick_date_index_link(
            &doc,
            "https://fbref.com/en/matches/2024-08-17",
            "Liverpool",
            "Bournemouth",
        )
        .unwrap()
        .expect("a link should match");
        assert!(href.contains("9e2b7a3f"), "picked {href}");
    }

    #[test]
    fn womens_fixture_excluded_even_without_competition_tag() {
        let html = r#"<html><body>
            <a href="/en/matches/77ddee11/Liverpool-Bournemouth-Women">W</a>
            <a href="/en/matches/55ccdd22/Arsenal-Chelsea-Premier-League">AC</a>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let href = pick_date_index_link(
            &doc,
            "https://fbref.com/en/matches/2024-08-17",
            "Liverpool",
            "Bournemouth",
        )
        .unwrap();
        assert_eq!(href, None);
    }

    #[test]
    fn non_index_url_is_not_an_index() {
        let doc = Html::parse_document(DATE_INDEX);
        let href = pick_date_index_link(
            &doc,
            "https://fbref.com/en/matches/9e2b7a3f/Liverpool-Bournemouth",
            "Liverpool",
            "Bournemouth",
        )
        .unwrap();
        assert_eq!(href, None, "report-shaped URLs are never treated as an index");
    }

    #[test]
    fn match_report_link_found_when_distinct() {
        let html = r#"<html><body>
            <a href="/en/matches/9e2b7a3f/Liverpool-Bournemouth-Premier-League">Match Report</a>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let href = match_report_link(&doc, "https://fbref.com/en/matches/2024-08-17").unwrap();
        assert!(href.is_some());

        let href = match_report_link(
            &doc,
            "https://fbref.com/en/matches/9e2b7a3f/Liverpool-Bournemouth-Premier-League",
        )
        .unwrap();
        assert_eq!(href, None, "already on the report");
    }
}
