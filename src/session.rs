use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::Html;
use tracing::{debug, info, warn};

use crate::error::{FbrefError, Result};
use crate::fbref::is_fbref_origin;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// A challenge page never carries this much markup; real match
/// reports are an order of magnitude larger.
const MIN_CONTENT_LEN: usize = 20_000;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    /// Independent sessions must use distinct user-data directories;
    /// no DOM is ever shared across sessions.
    pub user_data_dir: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            headless: true,
            user_data_dir: None,
        }
    }
}

/// One browser window, one tab, at most one in-flight operation.
///
/// All methods are synchronous with respect to this session; running
/// two matches in parallel requires two sessions.
pub struct Session {
    _browser: Browser,
    tab: Arc<Tab>,
    headless: bool,
}

impl Session {
    /// Launch the browser, suppress automation fingerprints, load a
    /// blank page, and close any extra windows.
    pub fn new(options: &SessionOptions) -> Result<Self> {
        let launch = LaunchOptions::default_builder()
            .headless(options.headless)
            .sandbox(false)
            .window_size(Some((1366, 900)))
            .user_data_dir(options.user_data_dir.clone())
            .args(vec![OsStr::new("--disable-blink-features=AutomationControlled")])
            .build()
            .context("failed to build Chrome launch options")?;
        let browser = Browser::new(launch).context("failed to launch Chrome")?;
        let tab = browser.new_tab().context("failed to create browser tab")?;

        tab.set_user_agent(USER_AGENT, None, None)
            .context("failed to set user agent")?;
        tab.enable_stealth_mode()
            .context("failed to enable stealth mode")?;

        // Refuse to proceed until the blank start page loads.
        tab.navigate_to("about:blank")
            .and_then(|t| t.wait_until_navigated())
            .context("blank start page did not load")?;

        // Single-window invariant: keep the first tab, close the rest.
        let tabs: Vec<Arc<Tab>> = browser
            .get_tabs()
            .lock()
            .map(|tabs| tabs.clone())
            .unwrap_or_default();
        for extra in tabs.iter().filter(|t| t.get_target_id() != tab.get_target_id()) {
            if let Err(e) = extra.close(true) {
                warn!(error = %e, "failed to close extra window");
            }
        }

        info!(headless = options.headless, "browser session ready");
        Ok(Session {
            _browser: browser,
            tab,
            headless: options.headless,
        })
    }

    pub fn is_headless(&self) -> bool {
        self.headless
    }

    /// Navigate and verify we ended up inside the fbref origin.
    pub fn open(&self, url: &str) -> Result<()> {
        debug!(url, "navigating");
        self.tab
            .navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .with_context(|| format!("navigation to {url} failed"))?;

        let landed = self.current_url();
        if landed == "about:blank" || !is_fbref_origin(&landed) {
            return Err(FbrefError::NavigationRedirected { url: landed });
        }
        Ok(())
    }

    pub fn current_url(&self) -> String {
        self.tab.get_url()
    }

    /// Poll until the page looks like real fbref content rather than a
    /// bot-protection interstitial, or the budget runs out.
    ///
    /// In a headed session the wait is interactive: the operator can
    /// complete the challenge in the visible window and the poll picks
    /// the real page up on its next pass. Headless sessions cannot be
    /// helped, so the caller should pass a shorter budget; a timeout
    /// returns `false` without logging noise.
    pub fn wait_for_access(&self, max_seconds: u64) -> bool {
        let deadline = Instant::now() + Duration::from_secs(max_seconds);
        let mut challenged = false;
        loop {
            match self.tab.get_content() {
                Ok(html) => {
                    if page_ready(&html) {
                        return true;
                    }
                    if !challenged && looks_like_challenge(&html) {
                        challenged = true;
                        if !self.headless {
                            info!("challenge page detected; complete it in the browser window");
                        }
                    }
                }
                Err(e) => debug!(error = %e, "could not read page content while waiting"),
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_secs(if self.headless { 1 } else { 2 }));
        }
    }

    /// Parse the current DOM. Extraction runs over this snapshot and
    /// performs no further I/O.
    pub fn source(&self) -> Result<Html> {
        let html = self.tab.get_content().context("failed to read page source")?;
        Ok(Html::parse_document(&html))
    }

    /// Raw page text, for debug dumps.
    pub fn raw_source(&self) -> Result<String> {
        Ok(self.tab.get_content().context("failed to read page source")?)
    }
}

/// Positive content indicators present, challenge indicators absent,
/// and enough markup to be a real page.
pub(crate) fn page_ready(html: &str) -> bool {
    has_content_markers(html) && !looks_like_challenge(html) && html.len() >= MIN_CONTENT_LEN
}

pub(crate) fn has_content_markers(html: &str) -> bool {
    html.contains("fbref.com") || html.contains("FBref") || html.contains("scorebox")
}

pub(crate) fn looks_like_challenge(html: &str) -> bool {
    let lower = html.to_lowercase();
    lower.contains("just a moment")
        || lower.contains("checking your browser")
        || lower.contains("cf-challenge")
        || lower.contains("verify you are human")
        || lower.contains("captcha")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_indicators() {
        assert!(looks_like_challenge(
            "<html><title>Just a moment...</title></html>"
        ));
        assert!(looks_like_challenge("please verify you are human"));
        assert!(!looks_like_challenge("<html><body>FBref report</body></html>"));
    }

    #[test]
    fn readiness_needs_all_three_conditions() {
        let big_report = format!(
            "<html><body><div class=\"scorebox\"></div>{}</body></html>",
            "x".repeat(MIN_CONTENT_LEN)
        );
        assert!(page_ready(&big_report));

        let small_report = "<html><body><div class=\"scorebox\"></div></body></html>";
        assert!(!page_ready(small_report), "under the length threshold");

        let big_challenge = format!(
            "<html><title>Just a moment...</title><div class=\"scorebox\"></div>{}</html>",
            "x".repeat(MIN_CONTENT_LEN)
        );
        assert!(!page_ready(&big_challenge), "challenge marker wins");
    }
}
