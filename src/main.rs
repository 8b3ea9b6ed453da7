//! Ripple-Crawl main entry point
//!
//! This is the command-line interface for the Ripple-Crawl traversal.

use clap::Parser;
use ripple_crawl::config::{load_config_with_hash, Config};
use ripple_crawl::crawler::{Crawler, Fetcher, HttpFetcher, StaticFetcher};
use ripple_crawl::normalize_url;
use ripple_crawl::output::{print_report, RecordFormat, RecordWriter};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Root of the built-in demo graph
const DEMO_ROOT: &str = "https://golang.org/";

/// Ripple-Crawl: a parallel, deduplicating web crawler
///
/// Fetches every page reachable from ROOT within the depth limit exactly once,
/// running fetches in parallel, and prints one line per page found.
#[derive(Parser, Debug)]
#[command(name = "ripple-crawl")]
#[command(version)]
#[command(about = "A parallel, deduplicating web crawler", long_about = None)]
struct Cli {
    /// Root URL to start crawling from
    #[arg(value_name = "ROOT", required_unless_present = "demo")]
    root: Option<String>,

    /// Maximum number of hops from the root (overrides the config file)
    #[arg(short, long)]
    depth: Option<u32>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of fetches in flight (overrides the config file)
    #[arg(long, value_name = "N")]
    max_concurrent: Option<u32>,

    /// Output format for discovered pages
    #[arg(long, value_enum, default_value_t = RecordFormat::Text)]
    format: RecordFormat,

    /// Crawl the built-in golang.org demo graph instead of the network
    #[arg(long, conflicts_with = "root")]
    demo: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => Config::default(),
    };

    if let Some(depth) = cli.depth {
        config.crawler.max_depth = depth;
    }
    if let Some(limit) = cli.max_concurrent {
        config.crawler.max_concurrent_fetches = limit;
    }
    ripple_crawl::config::validate(&config)?;

    let (root, fetcher): (String, Box<dyn Fetcher>) = if cli.demo {
        tracing::info!("Crawling the built-in demo graph");
        (DEMO_ROOT.to_string(), Box::new(StaticFetcher::golang_tour()))
    } else {
        let raw = cli.root.as_deref().unwrap_or_default();
        let root = normalize_url(raw)?;
        (root.to_string(), Box::new(HttpFetcher::from_config(&config)?))
    };

    handle_crawl(&config, root, fetcher, cli.format, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// Logs go to stderr so stdout carries only records.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_crawl=info,warn"),
            1 => EnvFilter::new("ripple_crawl=debug,info"),
            2 => EnvFilter::new("ripple_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Runs the crawl, streaming records to stdout until it completes or Ctrl-C
async fn handle_crawl(
    config: &Config,
    root: String,
    fetcher: Box<dyn Fetcher>,
    format: RecordFormat,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let crawler = Crawler::from_config(fetcher, &config.crawler);

    let cancel = crawler.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling crawl");
            cancel.cancel();
        }
    });

    let cancel = crawler.cancellation_token();
    let mut writer = RecordWriter::new(io::stdout().lock(), format);
    let mut write_error: Option<io::Error> = None;

    let report = crawler
        .run(root, config.crawler.max_depth, |record| {
            if write_error.is_some() {
                return;
            }
            if let Err(e) = writer.write_record(&record) {
                tracing::error!("Failed to write record: {}", e);
                cancel.cancel();
                write_error = Some(e);
            }
        })
        .await?;

    writer.flush()?;

    if !quiet {
        print_report(&report);
    }

    match write_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
