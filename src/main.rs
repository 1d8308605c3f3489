//! Sumi-Delta main entry point
//!
//! This is the command-line interface for the Sumi-Delta crawl pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sumi_delta::config::{load_config_with_hash, Config};
use sumi_delta::crawler::{CrawlWorker, PollLoop};
use sumi_delta::frontier::{FrontierClient, NewQueueItem};
use sumi_delta::index::{IndexClient, DEFAULT_QUERY_MODE};
use sumi_delta::server::{serve_frontier, serve_versions};
use sumi_delta::storage::{QueueStorage, SqliteQueue, SqliteStorage, Storage};
use sumi_delta::DeltaError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Sumi-Delta: an incremental, change-detecting crawl pipeline
///
/// The frontier holds the work queue; crawler processes pull from it,
/// re-fetch pages with conditional requests and forward only the chunks
/// whose content materially changed to the downstream index.
#[derive(Parser, Debug)]
#[command(name = "sumi-delta")]
#[command(version)]
#[command(about = "An incremental, change-detecting crawl pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (environment variables override it)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the frontier queue (RPC and REST listeners)
    Frontier,

    /// Run the crawl worker's poll loop and its versions endpoint
    Crawler,

    /// Enqueue URLs through the frontier
    Seed {
        /// Scope the URLs belong to
        #[arg(short, long)]
        scope: String,

        /// URLs to enqueue
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Show statistics from the local stores and exit
    Stats,

    /// Query the downstream index and print the decoded results
    Query {
        /// Query text
        query: String,

        /// Retrieval mode passed to the index
        #[arg(long, default_value = DEFAULT_QUERY_MODE)]
        mode: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (config, config_hash) = load_config_with_hash(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let (Some(path), Some(hash)) = (&cli.config, &config_hash) {
        tracing::info!(path = %path.display(), hash = %hash, "configuration loaded");
    }

    match cli.command {
        Command::Frontier => handle_frontier(&config).await,
        Command::Crawler => handle_crawler(&config).await,
        Command::Seed { scope, urls } => handle_seed(&config, &scope, urls).await,
        Command::Stats => handle_stats(&config),
        Command::Query { query, mode } => handle_query(&config, &query, &mode).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG`, when set, takes precedence over the flags.
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if quiet {
            // Only show errors
            EnvFilter::new("error")
        } else {
            match verbose {
                0 => EnvFilter::new("sumi_delta=info,warn"),
                1 => EnvFilter::new("sumi_delta=debug,info"),
                2 => EnvFilter::new("sumi_delta=trace,debug"),
                _ => EnvFilter::new("trace"),
            }
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Cancels `shutdown` on Ctrl-C
fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            shutdown.cancel();
        }
    });
}

fn parse_bind(value: &str, name: &str) -> Result<SocketAddr> {
    value
        .parse()
        .with_context(|| format!("invalid {} address: {}", name, value))
}

/// Runs the frontier until Ctrl-C
async fn handle_frontier(config: &Config) -> Result<()> {
    let frontier = &config.frontier;
    let rpc_addr = parse_bind(&frontier.rpc_bind, "RPC bind")?;
    let rest_addr = parse_bind(&frontier.rest_bind, "REST bind")?;

    let queue = SqliteQueue::new(Path::new(&frontier.database_path))
        .with_context(|| format!("failed to open queue store {}", frontier.database_path))?;
    tracing::info!(
        database = %frontier.database_path,
        queued = queue.count()?,
        "frontier starting"
    );

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    serve_frontier(queue, rpc_addr, rest_addr, shutdown)
        .await
        .context("frontier server failed")?;

    tracing::info!("frontier stopped");
    Ok(())
}

/// Runs the poll loop and versions endpoint until Ctrl-C
async fn handle_crawler(config: &Config) -> Result<()> {
    let crawler = &config.crawler;
    let versions_addr = parse_bind(&crawler.versions_bind, "versions bind")?;

    let storage = SqliteStorage::new(Path::new(&crawler.database_path))
        .with_context(|| format!("failed to open crawler store {}", crawler.database_path))?;

    let worker = CrawlWorker::from_config(config, storage.clone())?;
    let frontier = FrontierClient::new(&config.frontier.addr)?;
    let poll_loop = PollLoop::from_config(config, frontier, worker);

    tracing::info!(
        database = %crawler.database_path,
        index = %config.index.base_url,
        "crawler starting"
    );

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let poll_shutdown = shutdown.clone();
    tokio::try_join!(serve_versions(storage, versions_addr, shutdown), async move {
        poll_loop.run(poll_shutdown).await;
        Ok::<(), DeltaError>(())
    })
    .context("crawler failed")?;

    tracing::info!("crawler stopped");
    Ok(())
}

/// Enqueues URLs with generated ids and priority 0
async fn handle_seed(config: &Config, scope: &str, urls: Vec<String>) -> Result<()> {
    let client = FrontierClient::new(&config.frontier.addr)?;
    let submitted = urls.len();
    let items = urls
        .into_iter()
        .map(|url| NewQueueItem::new(url, scope))
        .collect();

    let accepted = client
        .put(items)
        .await
        .with_context(|| format!("failed to seed frontier at {}", client.base_url()))?;

    println!(
        "Seeded {} of {} URLs into scope '{}'",
        accepted, submitted, scope
    );
    Ok(())
}

/// Prints row counts from whichever local stores exist
fn handle_stats(config: &Config) -> Result<()> {
    println!("=== Sumi-Delta Statistics ===\n");

    let crawler_path = Path::new(&config.crawler.database_path);
    println!("Crawler store: {}", crawler_path.display());
    if crawler_path.exists() {
        let storage = SqliteStorage::new(crawler_path)?;
        println!("  Pages:        {}", storage.count_pages()?);
        println!("  Fingerprints: {}", storage.count_fingerprints()?);
        println!("  Versions:     {}", storage.count_versions()?);
    } else {
        println!("  (not found)");
    }

    let frontier_path = Path::new(&config.frontier.database_path);
    println!("\nFrontier store: {}", frontier_path.display());
    if frontier_path.exists() {
        let queue = SqliteQueue::new(frontier_path)?;
        println!("  Queued:       {}", queue.count()?);
        println!(
            "  In scope '{}': {}",
            config.crawler.scope,
            queue.count_scope(&config.crawler.scope)?
        );
    } else {
        println!("  (not found)");
    }

    Ok(())
}

/// Runs one index query and prints each result's metadata and snippet
async fn handle_query(config: &Config, query: &str, mode: &str) -> Result<()> {
    let index = IndexClient::new(
        &config.index.base_url,
        Duration::from_secs(config.index.timeout_secs),
    )?;
    let results = index
        .query(query, mode)
        .await
        .with_context(|| format!("query against {} failed", config.index.base_url))?;

    if results.is_empty() {
        println!("No results");
        return Ok(());
    }

    for result in results {
        let document = &result.document;
        match document.front_matter() {
            Some(meta) => println!(
                "#{} {} (chunk {}, version {}, docid {})",
                result.rank + 1,
                meta.url,
                meta.chunk_id,
                meta.version_ts,
                meta.docid
            ),
            None => println!("#{} (no metadata)", result.rank + 1),
        }

        let snippet: String = document.body.chars().take(200).collect();
        println!("   {}\n", snippet.replace('\n', " "));
    }

    Ok(())
}
