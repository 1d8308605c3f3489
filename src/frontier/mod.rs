//! Frontier queue wire types and client
//!
//! The queue itself lives in [`crate::storage::SqliteQueue`] and is served by
//! [`crate::server::serve_frontier`]; this module holds what both sides of
//! the wire share.

mod client;
mod types;

pub use client::{FrontierClient, QueueItemStream};
pub use types::{
    AckRequest, AckResponse, GetNextRequest, NewQueueItem, PutRequest, PutResponse, QueueItem,
    QueueStats, SeedRequest,
};
