//! Integration tests for the frontier over HTTP

use crate::common::TestFrontier;
use futures_util::StreamExt;
use sumi_delta::frontier::{NewQueueItem, QueueItem};
use sumi_delta::storage::QueueStorage;

fn item(id: &str, priority: i64) -> NewQueueItem {
    NewQueueItem {
        id: Some(id.to_string()),
        url: format!("http://example.test/{}", id),
        scope: "s1".to_string(),
        priority,
    }
}

async fn pull(frontier: &TestFrontier, scope: &str, limit: u32) -> Vec<QueueItem> {
    frontier
        .client()
        .get_next(scope, limit)
        .await
        .unwrap()
        .map(|item| item.unwrap())
        .collect()
        .await
}

#[tokio::test]
async fn test_put_get_next_ack_roundtrip() {
    let frontier = TestFrontier::start().await;
    let client = frontier.client();

    let accepted = client
        .put(vec![item("a", 1), item("b", 3), item("c", 3), item("a", 9)])
        .await
        .unwrap();
    assert_eq!(accepted, 3);

    let ids: Vec<String> = pull(&frontier, "s1", 10)
        .await
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, vec!["b", "c", "a"]);

    assert_eq!(client.ack(vec!["b".to_string(), "zzz".to_string()]).await.unwrap(), 1);
    assert_eq!(client.ack(vec!["b".to_string()]).await.unwrap(), 0);

    let ids: Vec<String> = pull(&frontier, "s1", 10)
        .await
        .into_iter()
        .map(|i| i.id)
        .collect();
    assert_eq!(ids, vec!["c", "a"]);
}

#[tokio::test]
async fn test_unacked_items_are_redelivered() {
    let frontier = TestFrontier::start().await;
    frontier.client().put(vec![item("a", 0)]).await.unwrap();

    let first = pull(&frontier, "s1", 1).await;
    let second = pull(&frontier, "s1", 1).await;
    assert_eq!(first.len(), 1);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_get_next_limit_and_scope() {
    let frontier = TestFrontier::start().await;
    let client = frontier.client();
    client
        .put(vec![
            item("a", 0),
            item("b", 0),
            item("c", 0),
            NewQueueItem::new("http://other.test/", "s2"),
        ])
        .await
        .unwrap();

    assert_eq!(pull(&frontier, "s1", 2).await.len(), 2);
    assert_eq!(pull(&frontier, "s2", 10).await.len(), 1);
    assert!(pull(&frontier, "s3", 10).await.is_empty());
}

#[tokio::test]
async fn test_seed_generates_ids_and_stats_counts_them() {
    let frontier = TestFrontier::start().await;
    let http = reqwest::Client::new();

    let response = http
        .post(frontier.rest_url("/seed"))
        .json(&serde_json::json!({
            "scope": "s1",
            "urls": ["http://example.test/1", "http://example.test/2", "http://example.test/3"]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let stats: serde_json::Value = http
        .get(frontier.rest_url("/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats, serde_json::json!({"queued": 3}));

    let items = pull(&frontier, "s1", 10).await;
    let urls: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["http://example.test/1", "http://example.test/2", "http://example.test/3"]
    );
    let ids: Vec<i64> = items.iter().map(|i| i.id.parse().unwrap()).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn test_malformed_bodies_are_client_errors() {
    let frontier = TestFrontier::start().await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("http://{}/rpc/put", frontier.rpc_addr))
        .header("content-type", "application/json")
        .body(r#"{"items": "nope"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let response = http
        .post(frontier.rest_url("/seed"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    assert_eq!(frontier.queue.count().unwrap(), 0);
}

#[tokio::test]
async fn test_unreachable_frontier_is_an_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = sumi_delta::FrontierClient::new(&format!("http://{}", addr)).unwrap();
    let result = client.get_next("s1", 8).await;
    assert!(result.is_err());
    assert!(result.err().unwrap().is_transient());
}
