//! Queue records and the JSON shapes exchanged with the frontier

use serde::{Deserialize, Serialize};

/// A URL work item as stored in the frontier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub url: String,
    pub scope: String,
    pub priority: i64,
    /// Unix milliseconds; not part of the wire format
    #[serde(skip)]
    pub enqueued_at: i64,
}

/// An item submitted through Put
///
/// The id is optional; the queue generates one when it is missing or empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewQueueItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub url: String,
    pub scope: String,
    #[serde(default)]
    pub priority: i64,
}

impl NewQueueItem {
    /// Builds an item with a generated id and priority 0
    pub fn new(url: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            id: None,
            url: url.into(),
            scope: scope.into(),
            priority: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PutRequest {
    pub items: Vec<NewQueueItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResponse {
    pub accepted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetNextRequest {
    pub scope: String,
    pub limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub acked: usize,
}

/// Body of `POST /seed`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedRequest {
    pub scope: String,
    pub urls: Vec<String>,
}

/// Body of `GET /stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queued: u64,
}
