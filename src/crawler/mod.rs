//! Crawler module for incremental page fetching and versioning
//!
//! This module contains the crawl worker side of the pipeline, including:
//! - Conditional HTTP fetching
//! - Best-effort archival records
//! - The per-item crawl cycle (extract, segment, detect, forward, persist)
//! - The poll loop feeding the worker from the frontier

mod archive;
mod fetcher;
mod poll;
mod worker;

pub use archive::ArchiveWriter;
pub use fetcher::{build_http_client, fetch_conditional, FetchResult, FetchedPage};
pub use poll::{BatchSummary, PollLoop, ERROR_BACKOFF};
pub use worker::{ChunkReport, CrawlOutcome, CrawlWorker};
