use std::fs;
use std::path::{Path, PathBuf};

use scraper::Html;
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::fbref;
use crate::model::{MatchRecord, Score};
use crate::session::{Session, SessionOptions};

/// The main entry point for scraping fbref.com match reports.
///
/// `FbrefClient` wraps a [`Session`] and exposes a method to turn a
/// match URL into a fully assembled [`MatchRecord`].
pub struct FbrefClient {
    session: Session,
    debug_dump_dir: Option<PathBuf>,
}

impl FbrefClient {
    /// Launch a browser session with default settings.
    pub fn new() -> Result<Self> {
        Self::with_options(&SessionOptions::default())
    }

    /// Launch a browser session using the provided options.
    pub fn with_options(options: &SessionOptions) -> Result<Self> {
        Ok(Self {
            session: Session::new(options)?,
            debug_dump_dir: None,
        })
    }

    /// Dump each resolved report page's raw HTML into `dir` before
    /// extraction, for offline inspection of parse failures.
    pub fn with_debug_dump_dir(mut self, dir: PathBuf) -> Self {
        self.debug_dump_dir = Some(dir);
        self
    }

    /// Navigate to `url`, resolve it to the canonical match report for
    /// `home` vs `away`, and extract everything into a [`MatchRecord`].
    ///
    /// `fixture_score` is the score as listed in the fixture source, used
    /// as a fallback when the report page yields no score of its own.
    #[instrument(skip(self, fixture_score))]
    pub fn scrape_match(
        &self,
        url: &str,
        home: &str,
        away: &str,
        fixture_score: Option<Score>,
    ) -> Result<MatchRecord> {
        let doc = fbref::navigate::resolve_match_report(&self.session, url, home, away)?;
        let resolved_url = self.session.current_url();

        if let Some(dir) = &self.debug_dump_dir {
            if let Err(err) = self.dump_page(dir, home, away) {
                warn!(%err, "failed to write debug dump");
            }
        }

        extract_match(&doc, &resolved_url, home, away, fixture_score)
    }

    fn dump_page(&self, dir: &Path, home: &str, away: &str) -> Result<()> {
        fs::create_dir_all(dir).map_err(|source| crate::error::FbrefError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let name = format!(
            "{}_vs_{}.html",
            home.replace(' ', "_").to_lowercase(),
            away.replace(' ', "_").to_lowercase()
        );
        let path = dir.join(name);
        fs::write(&path, self.session.raw_source()?).map_err(|source| {
            crate::error::FbrefError::Io {
                path: path.display().to_string(),
                source,
            }
        })?;
        debug!(path = %path.display(), "wrote debug dump");
        Ok(())
    }
}

/// Run every extractor over an already loaded report page.
///
/// This is a pure function of the DOM: extracting the same document
/// twice yields identical records, making parse behavior testable
/// without a browser.
pub fn extract_match(
    doc: &Html,
    url: &str,
    home: &str,
    away: &str,
    fixture_score: Option<Score>,
) -> Result<MatchRecord> {
    let header = fbref::header::extract_header(doc, url, home, away)?;
    let events = fbref::events::extract_events(doc, &header)?;
    let lineups = fbref::lineups::extract_lineups(doc, &header)?;
    let player_stats = fbref::player_stats::extract_player_stats(doc, &header)?;
    let team_stats = fbref::team_stats::extract_team_stats(doc, &header)?;

    Ok(fbref::assemble::assemble(
        header,
        events,
        lineups,
        player_stats,
        team_stats,
        fixture_score,
    ))
}
