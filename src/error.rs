use ::scraper::error::SelectorErrorKind;
use std::num::ParseIntError;

/// All errors that can occur while scraping fbref match reports.
///
/// Structural problems inside an otherwise-recognised extractor root
/// are deliberately NOT errors: they degrade to absent fields or to a
/// `warnings` entry on the emitted record.
#[derive(thiserror::Error, Debug)]
pub enum FbrefError {
    /// The browser ended on the blank page or a foreign origin
    /// (fbref has been observed to redirect misconfigured requests to
    /// an unrelated search page).
    #[error("navigation redirected away from fbref: ended at {url}")]
    NavigationRedirected { url: String },

    /// The bot-protection wait exceeded its budget.
    #[error("challenge page did not clear within {waited_secs}s for {url}")]
    ChallengeTimeout { url: String, waited_secs: u64 },

    /// A date-index page contained no link matching both teams.
    #[error("no Premier League match link for {home} vs {away} on {url}")]
    MatchNotFound {
        url: String,
        home: String,
        away: String,
    },

    /// The browser automation layer failed (launch, navigate, CDP).
    #[error("browser error: {0}")]
    Browser(#[from] anyhow::Error),

    /// A CSS selector string could not be parsed.
    #[error("invalid CSS selector: {0}")]
    Selector(String),

    /// An expected HTML element was not found on the page.
    #[error("expected element not found: {context}")]
    ElementNotFound { context: &'static str },

    /// Failed to parse an integer from scraped text.
    #[error("failed to parse integer: {0}")]
    IntParse(#[from] ParseIntError),

    /// Failed to parse a date from scraped text.
    #[error("failed to parse date: {0}")]
    DateParse(#[from] chrono::ParseError),

    /// Filesystem failure writing records or debug dumps.
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Record serialisation failure.
    #[error("failed to serialise match record: {0}")]
    Json(#[from] serde_json::Error),
}

impl<'a> From<SelectorErrorKind<'a>> for FbrefError {
    fn from(err: SelectorErrorKind<'a>) -> Self {
        FbrefError::Selector(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FbrefError>;
