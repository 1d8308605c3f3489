//! Integration tests for the crawl cycle
//!
//! A wiremock server plays the crawled site and another plays the index.

use crate::common::{queue_item, test_worker, TestFrontier};
use chrono::{TimeZone, Utc};
use std::time::Duration;
use sumi_delta::content::{make_docid, simhash};
use sumi_delta::crawler::{CrawlOutcome, PollLoop};
use sumi_delta::server::{serve_listener, versions_router, VersionsState};
use sumi_delta::storage::{ChunkFingerprint, QueueStorage, SqliteStorage, Storage};
use sumi_delta::DeltaError;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LAST_MODIFIED: &str = "Wed, 21 Oct 2015 07:28:00 GMT";

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn accepting_index() -> MockServer {
    let index = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/documents/file"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "ok"})))
        .mount(&index)
        .await;
    index
}

async fn submissions(index: &MockServer) -> Vec<String> {
    index
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() == "/documents/file")
        .map(|r| String::from_utf8_lossy(&r.body).into_owned())
        .collect()
}

#[tokio::test]
async fn test_seed_crawl_recrawl_end_to_end() {
    let site = MockServer::start().await;
    let index = accepting_index().await;
    let frontier = TestFrontier::start().await;
    let archive = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new_in_memory().unwrap();
    let worker = test_worker(storage.clone(), &index.uri(), archive.path());

    mount_page(&site, "/a", "# Title\nHello world").await;
    let url = format!("{}/a", site.uri());

    // Seed through the REST listener
    let response = reqwest::Client::new()
        .post(frontier.rest_url("/seed"))
        .json(&serde_json::json!({"scope": "s1", "urls": [url]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    // First crawl through the poll loop
    let poll = PollLoop::new(
        frontier.client(),
        worker.clone(),
        "s1",
        8,
        Duration::ZERO,
        Duration::ZERO,
    );
    let summary = poll.run_once(&CancellationToken::new()).await.unwrap();
    assert_eq!(summary.pulled, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.acked, 1);
    assert_eq!(frontier.queue.count_scope("s1").unwrap(), 0);

    let first = storage.get_fingerprint(&url, 0).unwrap().unwrap();
    assert_eq!(
        first.docid,
        make_docid("s1", &url, 0, first.updated_at)
    );
    let parts: Vec<&str> = first.docid.split('_').collect();
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[0], "s1");
    assert_eq!(parts[1].len(), 16);
    assert_eq!(parts[2], "0");
    assert_eq!(storage.count_versions().unwrap(), 1);
    assert_eq!(storage.count_fingerprints().unwrap(), 1);

    let sent = submissions(&index).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains(r#"name="file"; filename="doc.md""#));
    assert!(sent[0].contains(&format!(
        "---\nscope: s1\nurl: {}\nchunk_id: 0\ndocid: {}\nversion_ts: {}\n---\n\n# Title\nHello world",
        url, first.docid, first.updated_at
    )));

    // one archival record per successful fetch
    assert_eq!(std::fs::read_dir(archive.path()).unwrap().count(), 1);

    // Identical re-crawl later: nothing new
    let item = queue_item("again", &url, "s1");
    let outcome = worker
        .crawl_at(&item, Utc.timestamp_opt(first.updated_at + 60, 0).unwrap())
        .await
        .unwrap();
    match outcome {
        CrawlOutcome::Fetched(report) => {
            assert_eq!(report.chunks, 1);
            assert_eq!(report.unchanged, 1);
            assert_eq!(report.forwarded, 0);
        }
        other => panic!("expected fetched, got {:?}", other),
    }
    assert_eq!(storage.count_versions().unwrap(), 1);
    assert_eq!(submissions(&index).await.len(), 1);

    // Materially different body under the same heading
    site.reset().await;
    mount_page(
        &site,
        "/a",
        "# Title\nThe quick brown fox jumps over the lazy dog beside a quiet riverbank at dawn",
    )
    .await;

    let later = first.updated_at + 120;
    worker
        .crawl_at(&item, Utc.timestamp_opt(later, 0).unwrap())
        .await
        .unwrap();

    let second = storage.get_fingerprint(&url, 0).unwrap().unwrap();
    assert_ne!(second.docid, first.docid);
    assert_eq!(second.updated_at, later);
    assert_eq!(storage.count_fingerprints().unwrap(), 1);
    assert_eq!(submissions(&index).await.len(), 2);

    let versions = storage.list_versions(&url, Some(0), 10).unwrap();
    assert_eq!(versions.len(), 2);
    assert!(versions[0].version_ts > versions[1].version_ts);
    assert_eq!(versions[1].text, "# Title\nHello world");
}

#[tokio::test]
async fn test_versions_endpoint_over_http() {
    let site = MockServer::start().await;
    let index = accepting_index().await;
    let archive = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new_in_memory().unwrap();
    let worker = test_worker(storage.clone(), &index.uri(), archive.path());

    mount_page(&site, "/doc", "# One\nfirst section\n# Two\nsecond section").await;
    let url = format!("{}/doc", site.uri());
    worker
        .crawl_at(&queue_item("1", &url, "s1"), Utc.timestamp_opt(1_000, 0).unwrap())
        .await
        .unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let server = tokio::spawn(serve_listener(
        listener,
        versions_router(VersionsState { storage }),
        shutdown.clone(),
    ));

    let body: serde_json::Value = reqwest::Client::new()
        .get(format!("http://{}/versions", addr))
        .query(&[("url", url.as_str())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let versions = body["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 2);
    assert_eq!(versions[0]["chunk_id"], 0);
    assert_eq!(versions[0]["text"], "# One\nfirst section");
    assert_eq!(versions[1]["chunk_id"], 1);

    let body: serde_json::Value = reqwest::Client::new()
        .get(format!("http://{}/versions", addr))
        .query(&[("url", url.as_str()), ("chunk_id", "1")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["versions"].as_array().unwrap().len(), 1);
    assert_eq!(body["versions"][0]["text"], "# Two\nsecond section");

    shutdown.cancel();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_not_modified_only_touches_last_seen() {
    let site = MockServer::start().await;
    let index = accepting_index().await;
    let archive = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new_in_memory().unwrap();
    let worker = test_worker(storage.clone(), &index.uri(), archive.path());

    // Revalidation with both validators answers 304; mounted first so it wins
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("If-None-Match", "\"v1\""))
        .and(header_exists("If-Modified-Since"))
        .respond_with(ResponseTemplate::new(304))
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"v1\"")
                .insert_header("Last-Modified", LAST_MODIFIED)
                .set_body_string("# Page\nSome stable content"),
        )
        .mount(&site)
        .await;

    let url = format!("{}/page", site.uri());
    let item = queue_item("1", &url, "s1");

    let first = worker
        .crawl_at(&item, Utc.timestamp_opt(1_000, 0).unwrap())
        .await
        .unwrap();
    assert!(matches!(first, CrawlOutcome::Fetched(_)));

    let page = storage.get_page(&url).unwrap().unwrap();
    assert_eq!(page.etag.as_deref(), Some("\"v1\""));
    assert_eq!(page.last_modified.as_deref(), Some(LAST_MODIFIED));
    assert_eq!(page.last_seen, 1_000);
    let fingerprint = storage.get_fingerprint(&url, 0).unwrap().unwrap();

    let second = worker
        .crawl_at(&item, Utc.timestamp_opt(2_000, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(second, CrawlOutcome::NotModified);

    let page = storage.get_page(&url).unwrap().unwrap();
    assert_eq!(page.etag.as_deref(), Some("\"v1\""));
    assert_eq!(page.last_modified.as_deref(), Some(LAST_MODIFIED));
    assert_eq!(page.last_seen, 2_000);

    assert_eq!(storage.get_fingerprint(&url, 0).unwrap().unwrap(), fingerprint);
    assert_eq!(storage.count_versions().unwrap(), 1);
    assert_eq!(submissions(&index).await.len(), 1);

    // a 304 is not archived
    assert_eq!(std::fs::read_dir(archive.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_missing_validators_keep_stored_values() {
    let site = MockServer::start().await;
    let index = accepting_index().await;
    let archive = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new_in_memory().unwrap();
    let worker = test_worker(storage.clone(), &index.uri(), archive.path());

    Mock::given(method("GET"))
        .and(path("/p"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"abc\"")
                .set_body_string("hello"),
        )
        .mount(&site)
        .await;

    let url = format!("{}/p", site.uri());
    let item = queue_item("1", &url, "s1");
    worker
        .crawl_at(&item, Utc.timestamp_opt(10, 0).unwrap())
        .await
        .unwrap();

    // The server now ignores validators and sends a new Last-Modified only
    site.reset().await;
    Mock::given(method("GET"))
        .and(path("/p"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified", LAST_MODIFIED)
                .set_body_string("hello"),
        )
        .mount(&site)
        .await;

    worker
        .crawl_at(&item, Utc.timestamp_opt(20, 0).unwrap())
        .await
        .unwrap();

    let page = storage.get_page(&url).unwrap().unwrap();
    assert_eq!(page.etag.as_deref(), Some("\"abc\""));
    assert_eq!(page.last_modified.as_deref(), Some(LAST_MODIFIED));
    assert_eq!(page.last_seen, 20);
}

#[tokio::test]
async fn test_change_threshold() {
    let site = MockServer::start().await;
    let index = accepting_index().await;
    let archive = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new_in_memory().unwrap();
    let worker = test_worker(storage.clone(), &index.uri(), archive.path());

    let body = "# Notes\nSome text that will be fingerprinted";
    mount_page(&site, "/t", body).await;
    let url = format!("{}/t", site.uri());
    let item = queue_item("1", &url, "s1");
    let current = simhash(body);

    let stored = |simhash: u64| ChunkFingerprint {
        docid: "s1_stored_0_1".to_string(),
        url: url.clone(),
        scope: "s1".to_string(),
        chunk_id: 0,
        simhash,
        updated_at: 1,
    };

    // Two bits apart: skipped
    storage.upsert_fingerprint(&stored(current ^ 0b11)).unwrap();
    worker
        .crawl_at(&item, Utc.timestamp_opt(100, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(storage.count_versions().unwrap(), 0);
    assert!(submissions(&index).await.is_empty());
    assert_eq!(
        storage.get_fingerprint(&url, 0).unwrap().unwrap().docid,
        "s1_stored_0_1"
    );

    // Three bits apart: exactly one new version and a replaced fingerprint
    storage.upsert_fingerprint(&stored(current ^ 0b111)).unwrap();
    worker
        .crawl_at(&item, Utc.timestamp_opt(200, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(storage.count_versions().unwrap(), 1);
    assert_eq!(storage.count_fingerprints().unwrap(), 1);
    assert_eq!(submissions(&index).await.len(), 1);

    let replaced = storage.get_fingerprint(&url, 0).unwrap().unwrap();
    assert_eq!(replaced.simhash, current);
    assert_eq!(replaced.docid, make_docid("s1", &url, 0, 200));
}

#[tokio::test]
async fn test_index_rejection_persists_nothing_for_the_chunk() {
    let site = MockServer::start().await;
    let index = MockServer::start().await;
    let archive = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new_in_memory().unwrap();
    let worker = test_worker(storage.clone(), &index.uri(), archive.path());

    Mock::given(method("POST"))
        .and(path("/documents/file"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&index)
        .await;
    mount_page(&site, "/r", "# Heading\nbody").await;
    let url = format!("{}/r", site.uri());
    let item = queue_item("1", &url, "s1");

    let outcome = worker
        .crawl_at(&item, Utc.timestamp_opt(50, 0).unwrap())
        .await
        .unwrap();
    match outcome {
        CrawlOutcome::Fetched(report) => {
            assert_eq!(report.rejected, 1);
            assert_eq!(report.forwarded, 0);
        }
        other => panic!("expected fetched, got {:?}", other),
    }
    assert!(storage.get_fingerprint(&url, 0).unwrap().is_none());
    assert_eq!(storage.count_versions().unwrap(), 0);
    // the page record is still written
    assert_eq!(storage.get_page(&url).unwrap().unwrap().last_seen, 50);

    // once the index recovers the chunk is forwarded on the next crawl
    index.reset().await;
    Mock::given(method("POST"))
        .and(path("/documents/file"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&index)
        .await;
    worker
        .crawl_at(&item, Utc.timestamp_opt(60, 0).unwrap())
        .await
        .unwrap();
    assert_eq!(storage.count_versions().unwrap(), 1);
}

#[tokio::test]
async fn test_error_status_fails_the_item() {
    let site = MockServer::start().await;
    let index = accepting_index().await;
    let archive = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new_in_memory().unwrap();
    let worker = test_worker(storage.clone(), &index.uri(), archive.path());

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&site)
        .await;
    let url = format!("{}/gone", site.uri());

    let result = worker.crawl(&queue_item("1", &url, "s1")).await;
    match result {
        Err(DeltaError::UpstreamStatus { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected upstream status error, got {:?}", other),
    }
    assert!(storage.get_page(&url).unwrap().is_none());
    assert_eq!(std::fs::read_dir(archive.path()).map(|d| d.count()).unwrap_or(0), 0);
}

#[tokio::test]
async fn test_html_page_is_segmented_by_headings() {
    let site = MockServer::start().await;
    let index = accepting_index().await;
    let archive = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new_in_memory().unwrap();
    let worker = test_worker(storage.clone(), &index.uri(), archive.path());

    let html = r#"<html><head><title>Doc</title></head><body>
        <nav><a href="/">Home</a></nav>
        <article>
          <h1>Install</h1><p>Run the installer.</p>
          <h2>Configure</h2><p>Edit the file.</p>
        </article></body></html>"#;
    Mock::given(method("GET"))
        .and(path("/doc.html"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html, "text/html; charset=utf-8"))
        .mount(&site)
        .await;

    let url = format!("{}/doc.html", site.uri());
    worker
        .crawl_at(&queue_item("1", &url, "docs"), Utc.timestamp_opt(5, 0).unwrap())
        .await
        .unwrap();

    let versions = storage.list_versions(&url, None, 50).unwrap();
    let mut texts: Vec<(u32, String)> = versions
        .into_iter()
        .map(|v| (v.chunk_id, v.text))
        .collect();
    texts.sort();
    assert_eq!(
        texts,
        vec![
            (0, "# Install\nRun the installer.".to_string()),
            (1, "## Configure\nEdit the file.".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_changes_within_one_second_get_distinct_versions() {
    let site = MockServer::start().await;
    let index = accepting_index().await;
    let archive = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::new_in_memory().unwrap();
    let worker = test_worker(storage.clone(), &index.uri(), archive.path());

    let url = format!("{}/busy", site.uri());
    let item = queue_item("1", &url, "s1");
    let now = Utc.timestamp_opt(1_000, 0).unwrap();

    mount_page(&site, "/busy", "# News\nThe morning edition covers the harbour").await;
    worker.crawl_at(&item, now).await.unwrap();

    site.reset().await;
    mount_page(
        &site,
        "/busy",
        "# News\nEvening bulletin: storms expected over the northern valleys tonight",
    )
    .await;
    worker.crawl_at(&item, now).await.unwrap();

    let versions = storage.list_versions(&url, Some(0), 10).unwrap();
    let stamps: Vec<i64> = versions.iter().map(|v| v.version_ts).collect();
    assert_eq!(stamps, vec![1_001, 1_000]);
    assert!(versions[0].text.contains("Evening bulletin"));
    assert!(versions[1].text.contains("morning edition"));

    let live = storage.get_fingerprint(&url, 0).unwrap().unwrap();
    assert_eq!(live.docid, make_docid("s1", &url, 0, 1_001));
    assert_eq!(live.updated_at, 1_001);

    let sent = submissions(&index).await;
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains(&format!("docid: {}", make_docid("s1", &url, 0, 1_000))));
    assert!(sent[1].contains(&format!("docid: {}", make_docid("s1", &url, 0, 1_001))));
}
