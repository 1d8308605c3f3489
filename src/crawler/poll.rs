//! The crawl worker's poll loop
//!
//! Pull a batch for one scope, crawl it sequentially with a fixed delay
//! between items, then acknowledge the items that succeeded. Anything not
//! acknowledged stays queued and is delivered again later.

use futures_util::StreamExt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::worker::{CrawlOutcome, CrawlWorker};
use crate::config::Config;
use crate::frontier::{FrontierClient, QueueItem};
use crate::Result;

/// Pause after a failed GetNext before trying again
pub const ERROR_BACKOFF: Duration = Duration::from_secs(2);

/// What one batch did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub pulled: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Rows the frontier reported removed
    pub acked: usize,
    /// Shutdown was requested before the batch finished
    pub cancelled: bool,
}

pub struct PollLoop {
    frontier: FrontierClient,
    worker: CrawlWorker,
    scope: String,
    batch_size: u32,
    crawl_delay: Duration,
    poll_interval: Duration,
}

impl PollLoop {
    pub fn new(
        frontier: FrontierClient,
        worker: CrawlWorker,
        scope: impl Into<String>,
        batch_size: u32,
        crawl_delay: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            frontier,
            worker,
            scope: scope.into(),
            batch_size,
            crawl_delay,
            poll_interval,
        }
    }

    pub fn from_config(config: &Config, frontier: FrontierClient, worker: CrawlWorker) -> Self {
        let crawler = &config.crawler;
        Self::new(
            frontier,
            worker,
            crawler.scope.clone(),
            crawler.batch_size,
            Duration::from_millis(crawler.crawl_delay_ms),
            Duration::from_millis(crawler.poll_interval_ms),
        )
    }

    /// Runs until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) {
        tracing::info!(
            scope = %self.scope,
            batch_size = self.batch_size,
            frontier = %self.frontier.base_url(),
            "poll loop starting"
        );

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let pause = match self.run_once(&shutdown).await {
                Ok(summary) if summary.cancelled => break,
                Ok(summary) if summary.pulled == 0 => self.poll_interval,
                Ok(summary) => {
                    tracing::info!(
                        pulled = summary.pulled,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        acked = summary.acked,
                        "batch complete"
                    );
                    // spaces the last fetch of this batch from the first of the next
                    self.crawl_delay
                }
                Err(e) => {
                    tracing::warn!(error = %e, "frontier unavailable, backing off");
                    ERROR_BACKOFF
                }
            };

            if sleep_or_cancel(&shutdown, pause).await {
                break;
            }
        }

        tracing::info!(scope = %self.scope, "poll loop stopped");
    }

    /// Pulls and processes a single batch
    ///
    /// Errors only when the frontier cannot be reached for GetNext or Ack;
    /// per-item failures are counted in the summary.
    pub async fn run_once(&self, shutdown: &CancellationToken) -> Result<BatchSummary> {
        let items = self.pull(shutdown).await?;
        let mut summary = BatchSummary {
            pulled: items.len(),
            ..BatchSummary::default()
        };

        let mut completed = Vec::with_capacity(items.len());

        for (position, item) in items.iter().enumerate() {
            if position > 0 && sleep_or_cancel(shutdown, self.crawl_delay).await {
                summary.cancelled = true;
                break;
            }

            if shutdown.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let result = tokio::select! {
                _ = shutdown.cancelled() => None,
                result = self.worker.crawl(item) => Some(result),
            };

            match result {
                None => {
                    tracing::info!(id = %item.id, url = %item.url, "crawl interrupted by shutdown");
                    summary.cancelled = true;
                    break;
                }
                Some(Ok(outcome)) => {
                    log_outcome(item, &outcome);
                    completed.push(item.id.clone());
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        id = %item.id,
                        url = %item.url,
                        transient = e.is_transient(),
                        error = %e,
                        "crawl failed, leaving item queued"
                    );
                    summary.failed += 1;
                }
            }
        }

        summary.succeeded = completed.len();
        if !completed.is_empty() {
            summary.acked = self.frontier.ack(completed).await?;
        }

        Ok(summary)
    }

    /// Drains one GetNext stream, keeping whatever arrived before a failure
    async fn pull(&self, shutdown: &CancellationToken) -> Result<Vec<QueueItem>> {
        let mut stream = tokio::select! {
            _ = shutdown.cancelled() => return Ok(Vec::new()),
            stream = self.frontier.get_next(&self.scope, self.batch_size) => stream?,
        };

        let mut items = Vec::new();
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(item)) => items.push(item),
                Some(Err(e)) => {
                    tracing::warn!(received = items.len(), error = %e, "GetNext stream broke");
                    break;
                }
                None => break,
            }
        }

        Ok(items)
    }
}

fn log_outcome(item: &QueueItem, outcome: &CrawlOutcome) {
    match outcome {
        CrawlOutcome::NotModified => {
            tracing::info!(id = %item.id, url = %item.url, "not modified")
        }
        CrawlOutcome::Fetched(report) => tracing::info!(
            id = %item.id,
            url = %item.url,
            chunks = report.chunks,
            forwarded = report.forwarded,
            rejected = report.rejected,
            "crawled"
        ),
    }
}

/// Sleeps for `duration`; returns true if `shutdown` fired first
async fn sleep_or_cancel(shutdown: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}
