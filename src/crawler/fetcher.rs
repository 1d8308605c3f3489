//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with the configured user agent
//! - Conditional GET using stored `ETag` / `Last-Modified` validators
//! - Classifying responses into not-modified, fresh content or failure

use crate::storage::PageRecord;
use crate::{DeltaError, Result};
use bytes::Bytes;
use reqwest::header::{
    HeaderName, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::{Client, StatusCode};
use std::time::Duration;

/// Result of a conditional fetch that reached a usable response
#[derive(Debug)]
pub enum FetchResult {
    /// The server confirmed our cached copy (304)
    NotModified,

    /// Fresh content (2xx)
    Success(FetchedPage),
}

/// A 2xx response, fully read
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status_code: u16,
    /// `ETag` from this response, if sent
    pub etag: Option<String>,
    /// `Last-Modified` from this response, if sent
    pub last_modified: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Value sent in the `User-Agent` header
/// * `timeout` - Whole-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, revalidating against a previously stored page record
///
/// # Request Flow
///
/// 1. Attach `If-None-Match` / `If-Modified-Since` from `previous`
/// 2. Send GET (redirects followed by the client)
/// 3. Classify the response
///
/// | Response | Result |
/// |----------|--------|
/// | 304 | `Ok(NotModified)` |
/// | 2xx | `Ok(Success)` with body and validators |
/// | any other status | `Err(UpstreamStatus)` |
/// | transport failure | `Err(Timeout)` or `Err(Http)` |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `previous` - The stored record for this URL, if any
pub async fn fetch_conditional(
    client: &Client,
    url: &str,
    previous: Option<&PageRecord>,
) -> Result<FetchResult> {
    let mut request = client.get(url);

    if let Some(page) = previous {
        if let Some(etag) = page.etag.as_deref().filter(|v| !v.is_empty()) {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = page.last_modified.as_deref().filter(|v| !v.is_empty()) {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let response = request
        .send()
        .await
        .map_err(|e| DeltaError::from_request(url, e))?;

    let status = response.status();

    if status == StatusCode::NOT_MODIFIED {
        return Ok(FetchResult::NotModified);
    }

    if !status.is_success() {
        return Err(DeltaError::UpstreamStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let header = |name: HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .filter(|v| !v.is_empty())
    };

    let etag = header(ETAG);
    let last_modified = header(LAST_MODIFIED);
    let content_type = header(CONTENT_TYPE);

    let body = response
        .bytes()
        .await
        .map_err(|e| DeltaError::from_request(url, e))?;

    Ok(FetchResult::Success(FetchedPage {
        status_code: status.as_u16(),
        etag,
        last_modified,
        content_type,
        body,
    }))
}
