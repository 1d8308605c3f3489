//! Shared fixtures for the integration tests

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use sumi_delta::crawler::{build_http_client, ArchiveWriter, CrawlWorker};
use sumi_delta::frontier::{FrontierClient, QueueItem};
use sumi_delta::index::IndexClient;
use sumi_delta::server::{rest_router, rpc_router, serve_listener, FrontierState};
use sumi_delta::storage::{SqliteQueue, SqliteStorage};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A frontier serving an in-memory queue on two ephemeral ports
pub struct TestFrontier {
    pub queue: SqliteQueue,
    pub rpc_addr: SocketAddr,
    pub rest_addr: SocketAddr,
    pub shutdown: CancellationToken,
}

impl TestFrontier {
    pub async fn start() -> Self {
        let queue = SqliteQueue::new_in_memory().unwrap();
        let state = FrontierState {
            queue: queue.clone(),
        };
        let shutdown = CancellationToken::new();

        let rpc = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let rest = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let rpc_addr = rpc.local_addr().unwrap();
        let rest_addr = rest.local_addr().unwrap();

        tokio::spawn(serve_listener(rpc, rpc_router(state.clone()), shutdown.clone()));
        tokio::spawn(serve_listener(rest, rest_router(state), shutdown.clone()));

        Self {
            queue,
            rpc_addr,
            rest_addr,
            shutdown,
        }
    }

    pub fn client(&self) -> FrontierClient {
        FrontierClient::new(&format!("http://{}", self.rpc_addr)).unwrap()
    }

    pub fn rest_url(&self, path: &str) -> String {
        format!("http://{}{}", self.rest_addr, path)
    }
}

impl Drop for TestFrontier {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A worker with short timeouts pointed at `index_uri`
pub fn test_worker(storage: SqliteStorage, index_uri: &str, archive_dir: &Path) -> CrawlWorker {
    let client = build_http_client("SumiDeltaTest/1.0", Duration::from_secs(5)).unwrap();
    let index = IndexClient::new(index_uri, Duration::from_secs(5)).unwrap();
    CrawlWorker::new(storage, client, index, ArchiveWriter::new(archive_dir), 1600)
}

/// A queue item as the worker would receive it
pub fn queue_item(id: &str, url: &str, scope: &str) -> QueueItem {
    QueueItem {
        id: id.to_string(),
        url: url.to_string(),
        scope: scope.to_string(),
        priority: 0,
        enqueued_at: 0,
    }
}
