//! Client for the downstream text index
//!
//! Changed chunks are uploaded as markdown files carrying a front-matter
//! preamble; query results are parsed back into front matter and body.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::content::frontmatter::{self, DecodedDocument};
use crate::{DeltaError, Result};

/// Multipart field carrying the document
const FILE_FIELD: &str = "file";

/// File name given to every uploaded document
const FILE_NAME: &str = "doc.md";

/// Default query mode understood by the index
pub const DEFAULT_QUERY_MODE: &str = "hybrid";

#[derive(Debug, Clone)]
pub struct IndexClient {
    http: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    mode: &'a str,
}

/// The two response shapes the index is known to produce
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QueryResponse {
    Chunks { chunks: Vec<serde_json::Value> },
    Passages { passages: Vec<serde_json::Value> },
}

/// One text item returned by a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedChunk {
    /// Position in the index's result list (0 = best)
    pub rank: usize,
    pub document: DecodedDocument,
}

impl IndexClient {
    /// Creates a client for the index at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Index base URL, e.g. `http://localhost:9621`
    /// * `timeout` - Per-request timeout for uploads and queries
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Uploads one document
    ///
    /// Any non-2xx status is returned as [`DeltaError::IndexRejected`] with
    /// the response body.
    pub async fn submit(&self, docid: &str, document: String) -> Result<()> {
        let url = format!("{}/documents/file", self.base_url);

        let part = Part::text(document)
            .file_name(FILE_NAME)
            .mime_str("text/markdown")?;
        let form = Form::new().part(FILE_FIELD, part);

        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .multipart(form)
            .send()
            .await
            .map_err(|e| DeltaError::from_request(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeltaError::IndexRejected {
                docid: docid.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(docid, "document accepted by index");
        Ok(())
    }

    /// Runs a query and decodes the returned texts
    ///
    /// Responses in an unrecognised shape yield no results.
    pub async fn query(&self, query: &str, mode: &str) -> Result<Vec<RetrievedChunk>> {
        let url = format!("{}/query/data", self.base_url);

        let response = self
            .http
            .post(&url)
            .timeout(self.timeout)
            .json(&QueryRequest { query, mode })
            .send()
            .await
            .map_err(|e| DeltaError::from_request(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeltaError::UpstreamStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| DeltaError::from_request(&url, e))?;
        Ok(parse_query_response(&body))
    }
}

/// Decodes a query response body, failing closed to an empty list
pub fn parse_query_response(body: &[u8]) -> Vec<RetrievedChunk> {
    let items = match serde_json::from_slice::<QueryResponse>(body) {
        Ok(QueryResponse::Chunks { chunks }) => chunks,
        Ok(QueryResponse::Passages { passages }) => passages,
        Err(e) => {
            tracing::debug!(error = %e, "unrecognised query response shape");
            return Vec::new();
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(rank, item)| {
            let text = item.get("text")?.as_str()?;
            Some(RetrievedChunk {
                rank,
                document: frontmatter::decode(text),
            })
        })
        .collect()
}
