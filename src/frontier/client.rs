//! HTTP client for the frontier's Put/GetNext/Ack calls

use bytes::Bytes;
use futures_util::stream::Stream;
use reqwest::Client;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use super::types::{
    AckRequest, AckResponse, GetNextRequest, NewQueueItem, PutRequest, PutResponse, QueueItem,
};
use crate::{DeltaError, Result};

/// Timeout applied to each frontier call
const FRONTIER_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for a frontier RPC listener
#[derive(Debug, Clone)]
pub struct FrontierClient {
    http: Client,
    base_url: String,
}

impl FrontierClient {
    /// Creates a client for the frontier at `base_url` (e.g. `http://localhost:7071`)
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder().timeout(FRONTIER_TIMEOUT).build()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Creates a client reusing an existing reqwest client
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Enqueues items; returns how many were new
    pub async fn put(&self, items: Vec<NewQueueItem>) -> Result<usize> {
        let url = self.endpoint("/rpc/put");
        let response = self
            .http
            .post(&url)
            .json(&PutRequest { items })
            .send()
            .await
            .map_err(|e| DeltaError::from_request(&url, e))?;

        let response = check_status(&url, response).await?;
        let body: PutResponse = response.json().await?;
        Ok(body.accepted)
    }

    /// Opens a GetNext stream for up to `limit` items of `scope`
    ///
    /// The stream yields items as their lines arrive and ends when the
    /// frontier closes the response. It cannot be restarted.
    pub async fn get_next(&self, scope: &str, limit: u32) -> Result<QueueItemStream> {
        let url = self.endpoint("/rpc/get-next");
        let response = self
            .http
            .post(&url)
            .json(&GetNextRequest {
                scope: scope.to_string(),
                limit,
            })
            .send()
            .await
            .map_err(|e| DeltaError::from_request(&url, e))?;

        let response = check_status(&url, response).await?;
        Ok(QueueItemStream::new(url, response.bytes_stream()))
    }

    /// Acknowledges ids; returns how many were still queued
    pub async fn ack(&self, ids: Vec<String>) -> Result<usize> {
        let url = self.endpoint("/rpc/ack");
        let response = self
            .http
            .post(&url)
            .json(&AckRequest { ids })
            .send()
            .await
            .map_err(|e| DeltaError::from_request(&url, e))?;

        let response = check_status(&url, response).await?;
        let body: AckResponse = response.json().await?;
        Ok(body.acked)
    }
}

async fn check_status(url: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(url, status = status.as_u16(), body = %body, "frontier call failed");
    Err(DeltaError::UpstreamStatus {
        url: url.to_string(),
        status: status.as_u16(),
    })
}

/// Stream adapter turning newline-delimited JSON bytes into queue items
pub struct QueueItemStream {
    inner: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    buffer: Vec<u8>,
    url: String,
    done: bool,
}

impl QueueItemStream {
    pub(crate) fn new(
        url: String,
        byte_stream: impl Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: Vec::new(),
            url,
            done: false,
        }
    }
}

impl Stream for QueueItemStream {
    type Item = Result<QueueItem>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(item) = take_line(&mut this.buffer) {
                return Poll::Ready(Some(item));
            }

            if this.done {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    this.buffer.clear();
                    return Poll::Ready(Some(Err(DeltaError::from_request(&this.url, e))));
                }
                Poll::Ready(None) => {
                    // a final line without its newline still counts
                    this.done = true;
                    if !this.buffer.iter().all(u8::is_ascii_whitespace) {
                        this.buffer.push(b'\n');
                    }
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Pops one complete, non-blank line off the buffer and decodes it
fn take_line(buffer: &mut Vec<u8>) -> Option<Result<QueueItem>> {
    loop {
        let newline = buffer.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = buffer.drain(..=newline).collect();

        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        return Some(serde_json::from_slice(&line).map_err(|e| {
            DeltaError::Frontier(format!(
                "malformed queue item {:?}: {}",
                String::from_utf8_lossy(&line).trim_end(),
                e
            ))
        }));
    }
}
