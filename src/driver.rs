use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::client::FbrefClient;
use crate::error::{FbrefError, Result};
use crate::fbref::{find_score_pair, BASE_URL};
use crate::model::Score;

/// One fixture from the season schedule, as read from the fixtures
/// JSON file. `url` is optional; fixtures without one are looked up
/// through the date index for their match day.
#[derive(Debug, Clone, Deserialize)]
pub struct Fixture {
    pub date: NaiveDate,
    pub home: String,
    pub away: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Schedule-listed final score, e.g. "1-0".
    #[serde(default)]
    pub score: Option<String>,
}

impl Fixture {
    pub fn match_url(&self) -> String {
        match &self.url {
            Some(url) if url.starts_with("http") => url.clone(),
            Some(url) => format!("{BASE_URL}{url}"),
            None => format!("{BASE_URL}/en/matches/{}", self.date),
        }
    }

    pub fn listed_score(&self) -> Option<Score> {
        self.score.as_deref().and_then(find_score_pair)
    }
}

#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub season: String,
    pub out_root: PathBuf,
    pub delay_seconds: u64,
    pub limit: Option<usize>,
    pub start_from: usize,
    pub skip_existing: bool,
    pub max_consecutive_failures: u32,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            season: "current".to_string(),
            out_root: PathBuf::from("data"),
            delay_seconds: 2,
            limit: None,
            start_from: 0,
            skip_existing: false,
            max_consecutive_failures: 5,
        }
    }
}

/// Outcome of a season run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub scraped: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Fixture index at which the run stopped after too many failures
    /// in a row. Pass it back as `start_from` to resume.
    pub halted_at: Option<usize>,
}

pub fn load_fixtures(path: &Path) -> Result<Vec<Fixture>> {
    let raw = fs::read_to_string(path).map_err(|source| FbrefError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Scrape every fixture in order, writing one JSON file per match and
/// sleeping between requests.
pub fn run(client: &FbrefClient, fixtures: &[Fixture], options: &DriverOptions) -> Result<RunReport> {
    let season = season_slug(&options.season);
    let matches_dir = options.out_root.join(&season).join("matches");
    fs::create_dir_all(&matches_dir).map_err(|source| FbrefError::Io {
        path: matches_dir.display().to_string(),
        source,
    })?;

    let mut report = RunReport::default();
    let mut consecutive_failures = 0u32;

    for (index, fixture) in fixtures.iter().enumerate().skip(options.start_from) {
        if let Some(limit) = options.limit {
            if report.scraped + report.failed >= limit {
                break;
            }
        }

        let out_path = matches_dir.join(record_file_name(fixture));
        if options.skip_existing && out_path.exists() {
            info!(fixture = %fixture_label(fixture), "already scraped, skipping");
            report.skipped += 1;
            continue;
        }

        info!(index, fixture = %fixture_label(fixture), "scraping");
        match scrape_with_retry(client, fixture) {
            Ok(record) => {
                write_record(&out_path, &record)?;
                if !record.warnings.is_empty() {
                    warn!(
                        fixture = %fixture_label(fixture),
                        warnings = record.warnings.len(),
                        "scraped with warnings"
                    );
                }
                report.scraped += 1;
                consecutive_failures = 0;
            }
            Err(err) => {
                error!(fixture = %fixture_label(fixture), %err, "scrape failed");
                report.failed += 1;
                consecutive_failures += 1;
                if consecutive_failures >= options.max_consecutive_failures {
                    error!(
                        failures = consecutive_failures,
                        resume_from = index + 1,
                        "too many failures in a row, halting"
                    );
                    report.halted_at = Some(index + 1);
                    return Ok(report);
                }
            }
        }

        sleep(Duration::from_secs(options.delay_seconds));
    }
    Ok(report)
}

/// A redirect can be transient (interstitial bounce); one retry is
/// worth the round trip. Everything else fails the match outright.
fn scrape_with_retry(client: &FbrefClient, fixture: &Fixture) -> Result<crate::model::MatchRecord> {
    let attempt = || {
        client.scrape_match(
            &fixture.match_url(),
            &fixture.home,
            &fixture.away,
            fixture.listed_score(),
        )
    };
    match attempt() {
        Err(FbrefError::NavigationRedirected { url }) => {
            warn!(url, "redirected, retrying once");
            attempt()
        }
        other => other,
    }
}

fn write_record(path: &Path, record: &crate::model::MatchRecord) -> Result<()> {
    let file = fs::File::create(path).map_err(|source| FbrefError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::to_writer_pretty(file, record)?)
}

fn fixture_label(fixture: &Fixture) -> String {
    format!("{} {} vs {}", fixture.date, fixture.home, fixture.away)
}

/// `match_<YYYY_MM_DD>_<home>_vs_<away>.json`, spaces as underscores.
pub fn record_file_name(fixture: &Fixture) -> String {
    format!(
        "match_{}_{}_vs_{}.json",
        fixture.date.format("%Y_%m_%d"),
        sanitize_name(&fixture.home),
        sanitize_name(&fixture.away),
    )
}

fn sanitize_name(name: &str) -> String {
    name.trim()
        .replace(['\'', '\u{2019}'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalise season input to `YYYY-YYYY`. Accepts "2024-2025",
/// "24/25", and "current" (which rolls over each August).
pub fn season_slug(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("current") {
        let today = chrono::Local::now().date_naive();
        let start = if today.month() >= 8 {
            today.year()
        } else {
            today.year() - 1
        };
        return format!("{}-{}", start, start + 1);
    }
    if let Some((a, b)) = trimmed.split_once(['/', '-']) {
        if let (Ok(a), Ok(b)) = (a.parse::<i32>(), b.parse::<i32>()) {
            let start = if a < 100 { 2000 + a } else { a };
            let end = if b < 100 { 2000 + b } else { b };
            if end == start + 1 {
                return format!("{start}-{end}");
            }
        }
    }
    if let Ok(start) = trimmed.parse::<i32>() {
        return format!("{}-{}", start, start + 1);
    }
    trimmed.to_string()
}
