//! Season scraper CLI
//!
//! Walks a fixtures file and writes one match-report JSON per fixture.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fbref_scraper::session::SessionOptions;
use fbref_scraper::{driver, DriverOptions, FbrefClient};

#[derive(Parser)]
#[command(name = "scrape_season")]
#[command(about = "Scrape Premier League match reports from fbref.com", long_about = None)]
struct Cli {
    /// Season to scrape, e.g. "2024-2025", "24/25", or "current"
    #[arg(long, default_value = "current")]
    season: String,

    /// Fixtures JSON file (array of {date, home, away, url?, score?})
    #[arg(long)]
    fixtures: PathBuf,

    /// Output root; records land in <out>/<season>/matches/
    #[arg(long, default_value = "data")]
    out: PathBuf,

    /// Seconds to sleep between matches
    #[arg(long, default_value = "2")]
    delay: u64,

    /// Stop after this many scrape attempts
    #[arg(long)]
    limit: Option<usize>,

    /// Fixture index to resume from
    #[arg(long, default_value = "0")]
    start_from: usize,

    /// Skip matches whose output file already exists
    #[arg(long)]
    skip_existing: bool,

    /// Start without asking for confirmation
    #[arg(long)]
    skip_approval: bool,

    /// Run the browser with a visible window, useful when a challenge
    /// page needs a human
    #[arg(long)]
    no_headless: bool,

    /// Dump each report page's raw HTML and enable debug logging
    #[arg(long)]
    debug: bool,

    /// Where debug dumps go (implies --debug)
    #[arg(long)]
    debug_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug || cli.debug_dir.is_some() {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> fbref_scraper::Result<ExitCode> {
    let fixtures = driver::load_fixtures(&cli.fixtures)?;
    println!("Loaded {} fixtures from {}", fixtures.len(), cli.fixtures.display());

    if !cli.skip_approval && !confirm_start(fixtures.len()) {
        println!("Aborted");
        return Ok(ExitCode::SUCCESS);
    }

    let session_options = SessionOptions {
        headless: !cli.no_headless,
        ..SessionOptions::default()
    };
    let mut client = FbrefClient::with_options(&session_options)?;
    if cli.debug || cli.debug_dir.is_some() {
        let dir = cli.debug_dir.unwrap_or_else(|| PathBuf::from("debug_dumps"));
        client = client.with_debug_dump_dir(dir);
    }

    let options = DriverOptions {
        season: cli.season,
        out_root: cli.out,
        delay_seconds: cli.delay,
        limit: cli.limit,
        start_from: cli.start_from,
        skip_existing: cli.skip_existing,
        ..DriverOptions::default()
    };

    let report = driver::run(&client, &fixtures, &options)?;
    println!(
        "Done: {} scraped, {} skipped, {} failed",
        report.scraped, report.skipped, report.failed
    );

    if let Some(index) = report.halted_at {
        eprintln!("Halted after repeated failures. Resume with --start-from {index}");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn confirm_start(count: usize) -> bool {
    print!("Scrape {count} fixtures? [y/N] ");
    let _ = io::Write::flush(&mut io::stdout());
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim(), "y" | "Y" | "yes")
}
