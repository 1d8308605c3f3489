//! One crawl cycle per queue item
//!
//! Conditional fetch, extraction, segmentation, per-chunk change detection,
//! forwarding of changed chunks to the index and persistence of fingerprints,
//! versions and cache validators.

use chrono::{DateTime, Utc};
use reqwest::Client;
use std::time::Duration;

use super::archive::ArchiveWriter;
use super::fetcher::{build_http_client, fetch_conditional, FetchResult};
use crate::config::Config;
use crate::content::frontmatter::{self, FrontMatter};
use crate::content::{extract_text, is_changed, make_docid, segment, simhash, ExtractionTier};
use crate::frontier::QueueItem;
use crate::index::IndexClient;
use crate::storage::{ChunkFingerprint, PageRecord, SqliteStorage, Storage};
use crate::Result;

/// What a successful crawl of one item did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// 304: only `last_seen` was refreshed
    NotModified,

    /// Fresh content was processed
    Fetched(ChunkReport),
}

/// Per-chunk tally for a fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkReport {
    pub tier: ExtractionTier,
    pub chunks: usize,
    /// Chunks within the change threshold of their stored fingerprint
    pub unchanged: usize,
    /// Changed chunks accepted by the index and versioned
    pub forwarded: usize,
    /// Changed chunks the index did not accept; nothing was persisted for them
    pub rejected: usize,
}

/// Crawls queue items against one crawler store and one index
#[derive(Debug, Clone)]
pub struct CrawlWorker {
    storage: SqliteStorage,
    client: Client,
    index: IndexClient,
    archive: ArchiveWriter,
    max_chunk_len: usize,
}

impl CrawlWorker {
    pub fn new(
        storage: SqliteStorage,
        client: Client,
        index: IndexClient,
        archive: ArchiveWriter,
        max_chunk_len: usize,
    ) -> Self {
        Self {
            storage,
            client,
            index,
            archive,
            max_chunk_len,
        }
    }

    /// Builds a worker from configuration around an already opened store
    pub fn from_config(config: &Config, storage: SqliteStorage) -> Result<Self> {
        let crawler = &config.crawler;
        let client = build_http_client(
            &crawler.user_agent,
            Duration::from_secs(crawler.fetch_timeout_secs),
        )?;
        let index = IndexClient::new(
            &config.index.base_url,
            Duration::from_secs(config.index.timeout_secs),
        )?;

        Ok(Self::new(
            storage,
            client,
            index,
            ArchiveWriter::new(&crawler.archive_dir),
            crawler.max_chunk_len,
        ))
    }

    /// Crawls `item` now
    pub async fn crawl(&self, item: &QueueItem) -> Result<CrawlOutcome> {
        self.crawl_at(item, Utc::now()).await
    }

    /// Crawls `item`, stamping `last_seen`, docids and versions with `now`
    ///
    /// A changed chunk whose slot already has a version at or after `now` is
    /// stamped one second past that version instead.
    ///
    /// Returns an error when the fetch fails (transport error, or a status
    /// other than 2xx/304) or the store fails; the item should then stay
    /// queued. A chunk the index rejects does not fail the item.
    pub async fn crawl_at(&self, item: &QueueItem, now: DateTime<Utc>) -> Result<CrawlOutcome> {
        let url = item.url.as_str();
        let timestamp = now.timestamp();
        let previous_page = self.storage.get_page(url)?;

        let page = match fetch_conditional(&self.client, url, previous_page.as_ref()).await? {
            FetchResult::NotModified => {
                self.storage.touch_page(url, timestamp)?;
                tracing::debug!(url, "not modified");
                return Ok(CrawlOutcome::NotModified);
            }
            FetchResult::Success(page) => page,
        };

        self.archive.record(url, page.status_code, now).await;

        let extracted = extract_text(&page.body, page.content_type.as_deref());
        let chunks = segment(&extracted.text, self.max_chunk_len);

        let mut report = ChunkReport {
            tier: extracted.tier,
            chunks: chunks.len(),
            unchanged: 0,
            forwarded: 0,
            rejected: 0,
        };

        for (index, chunk) in chunks.iter().enumerate() {
            let chunk_id = index as u32;
            let fingerprint = simhash(chunk);
            let previous = self
                .storage
                .get_fingerprint(url, chunk_id)?
                .map(|stored| stored.simhash);

            if !is_changed(fingerprint, previous) {
                report.unchanged += 1;
                continue;
            }

            // a slot's version stamps strictly increase, even within one second
            let version_ts = match self.storage.latest_version_ts(url, chunk_id)? {
                Some(latest) if latest >= timestamp => latest + 1,
                _ => timestamp,
            };

            let docid = make_docid(&item.scope, url, chunk_id, version_ts);
            let document = frontmatter::encode(
                &FrontMatter {
                    scope: item.scope.clone(),
                    url: url.to_string(),
                    chunk_id,
                    docid: docid.clone(),
                    version_ts,
                },
                chunk,
            );

            if let Err(e) = self.index.submit(&docid, document).await {
                tracing::warn!(url, chunk_id, docid = %docid, error = %e, "index submission failed");
                report.rejected += 1;
                continue;
            }

            self.storage.record_changed_chunk(
                &ChunkFingerprint {
                    docid,
                    url: url.to_string(),
                    scope: item.scope.clone(),
                    chunk_id,
                    simhash: fingerprint,
                    updated_at: version_ts,
                },
                chunk,
            )?;
            report.forwarded += 1;
        }

        // Validators missing from this response keep their stored values
        let (stored_etag, stored_last_modified) = previous_page
            .map(|p| (p.etag, p.last_modified))
            .unwrap_or_default();

        self.storage.upsert_page(&PageRecord {
            url: url.to_string(),
            etag: page.etag.or(stored_etag),
            last_modified: page.last_modified.or(stored_last_modified),
            last_seen: timestamp,
        })?;

        tracing::debug!(
            url,
            tier = extracted.tier.as_str(),
            chunks = report.chunks,
            unchanged = report.unchanged,
            forwarded = report.forwarded,
            rejected = report.rejected,
            "crawled"
        );

        Ok(CrawlOutcome::Fetched(report))
    }
}
