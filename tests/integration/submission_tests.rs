//! Integration tests for submissions
//!
//! These tests use wiremock to stand in for the IndexNow endpoint and check
//! the requests sent and the log entries written.

use indexnow_notify::config::EndpointConfig;
use indexnow_notify::notify::{spawn_worker, table_request, EventFilter, NotificationQueue, Notifier};
use indexnow_notify::retry::RetryPolicy;
use indexnow_notify::storage::{share, LogFilter, LogStore, SqliteLogStore};
use indexnow_notify::submit::{build_http_client, Origin};
use indexnow_notify::{
    Action, IndexNowError, SubmissionRequest, SubmissionResult, SubmissionStatus, Submitter,
};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "0123456789abcdef";
const HOST: &str = "example.com";

/// Creates a submitter pointed at the mock server, with no pause between chunks
fn create_submitter(server: &MockServer, batch_size: usize) -> Submitter {
    create_submitter_with_delay(server, batch_size, Duration::ZERO)
}

fn create_submitter_with_delay(server: &MockServer, batch_size: usize, delay: Duration) -> Submitter {
    let client = build_http_client(&EndpointConfig::default()).expect("Failed to build client");
    let endpoint =
        Url::parse(&format!("{}/indexnow", server.uri())).expect("Failed to parse endpoint");
    Submitter::new(client, endpoint, HOST, API_KEY).with_batching(batch_size, delay)
}

/// Mounts `/indexnow` -> `/hop/1` -> ... -> `/hop/<hops>`, the last hop answering 200
async fn mount_redirect_chain(server: &MockServer, hops: usize) {
    for hop in 0..hops {
        let from = if hop == 0 {
            "/indexnow".to_string()
        } else {
            format!("/hop/{}", hop)
        };
        Mock::given(path(from))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("Location", format!("{}/hop/{}", server.uri(), hop + 1)),
            )
            .mount(server)
            .await;
    }

    Mock::given(path(format!("/hop/{}", hops)))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

fn site_urls(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("https://{}/page/{}", HOST, i))
        .collect()
}

async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(path("/indexnow"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_single_url_is_sent_as_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexnow"))
        .and(query_param("url", "https://example.com/a/"))
        .and(query_param("key", API_KEY))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let store = share(SqliteLogStore::open_in_memory(RetryPolicy::default()).unwrap());
    let notifier = Notifier::new(store.clone(), create_submitter(&server, 10_000));

    let request =
        SubmissionRequest::single("https://example.com/a/", Action::Create, Origin::record("news", 1))
            .unwrap();
    let entries = notifier.notify(&request).await.unwrap();

    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.status, SubmissionStatus::Success);
    assert_eq!(entry.attempts, 1);
    assert_eq!(entry.response_code, Some(200));
    assert_eq!(entry.next_retry, None);
    assert_eq!(entry.origin, Origin::record("news", 1));

    let stored = store.lock().unwrap().get_entry(entry.id).unwrap();
    assert_eq!(&stored, entry);
}

#[tokio::test]
async fn test_multiple_urls_are_sent_as_json_post() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexnow"))
        .and(header("content-type", "application/json; charset=utf-8"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let submitter = create_submitter(&server, 10_000);
    let urls = vec![
        "https://example.com/a".to_string(),
        "https://example.com/b".to_string(),
        "https://example.com/a".to_string(),
    ];
    let result = submitter.submit(&urls).await;

    assert!(result.success);
    assert_eq!(result.code, 202);
    assert_eq!(result.message, "URL received, pending processing");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["host"], "example.com");
    assert_eq!(body["key"], API_KEY);
    assert_eq!(body["keyLocation"], "https://example.com/0123456789abcdef.txt");
    assert_eq!(
        body["urlList"],
        serde_json::json!(["https://example.com/a", "https://example.com/b"])
    );
}

#[tokio::test]
async fn test_empty_submission_sends_nothing() {
    let server = MockServer::start().await;
    mount_status(&server, 200).await;

    let submitter = create_submitter(&server, 10_000);
    let result = submitter.submit_batch(&["  ".to_string()]).await;

    assert_eq!(result, SubmissionResult::no_urls());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_large_batch_is_split_into_chunks() {
    let server = MockServer::start().await;
    mount_status(&server, 200).await;

    let submitter = create_submitter(&server, 10_000);
    let result = submitter.submit_batch(&site_urls(25_000)).await;

    assert_eq!(result, SubmissionResult::all_batches_succeeded());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);

    let sizes: Vec<usize> = requests
        .iter()
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["urlList"].as_array().map(|list| list.len()).unwrap_or(0)
        })
        .collect();
    assert_eq!(sizes, vec![10_000, 10_000, 5_000]);
}

#[tokio::test]
async fn test_batch_stops_at_first_failing_chunk() {
    let server = MockServer::start().await;
    Mock::given(path("/indexnow"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_status(&server, 500).await;

    let submitter = create_submitter(&server, 10_000);
    let result = submitter.submit_batch(&site_urls(25_000)).await;

    assert_eq!(result, SubmissionResult::from_status(500));
    assert!(!result.success);
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_single_url_batch_returns_its_own_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/indexnow"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let submitter = create_submitter(&server, 10_000);
    let result = submitter
        .submit_batch(&["https://example.com/only".to_string()])
        .await;

    assert_eq!(result, SubmissionResult::from_status(202));
}

#[tokio::test]
async fn test_failed_batch_logs_every_url_for_retry() {
    let server = MockServer::start().await;
    mount_status(&server, 503).await;

    let store = share(SqliteLogStore::open_in_memory(RetryPolicy::default()).unwrap());
    let notifier = Notifier::new(store.clone(), create_submitter(&server, 10_000));

    let request = SubmissionRequest::new(site_urls(3), Action::Manual, Origin::none()).unwrap();
    let entries = notifier.notify(&request).await.unwrap();

    assert_eq!(entries.len(), 3);
    for entry in &entries {
        assert_eq!(entry.status, SubmissionStatus::Failed);
        assert_eq!(entry.response_code, Some(503));
        assert_eq!(entry.response_message.as_deref(), Some("Service Unavailable"));
        assert!(entry.next_retry.is_some());
    }

    let failed = LogFilter::new().with_status(SubmissionStatus::Failed);
    assert_eq!(store.lock().unwrap().count_entries(&failed).unwrap(), 3);
}

#[tokio::test]
async fn test_rejected_key_is_permanent() {
    let server = MockServer::start().await;
    mount_status(&server, 403).await;

    let store = share(SqliteLogStore::open_in_memory(RetryPolicy::default()).unwrap());
    let notifier = Notifier::new(store, create_submitter(&server, 10_000));

    let request =
        SubmissionRequest::single("https://example.com/a", Action::Update, Origin::none()).unwrap();
    let entries = notifier.notify(&request).await.unwrap();

    assert_eq!(entries[0].status, SubmissionStatus::PermanentFail);
    assert_eq!(
        entries[0].response_message.as_deref(),
        Some("Forbidden - API key not valid for this URL")
    );
    assert_eq!(entries[0].next_retry, None);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_connection_error() {
    let client = build_http_client(&EndpointConfig::default()).unwrap();
    let endpoint = Url::parse("http://127.0.0.1:1/indexnow").unwrap();
    let submitter = Submitter::new(client, endpoint, HOST, API_KEY);

    let result = submitter
        .submit(&["https://example.com/a".to_string()])
        .await;

    assert!(!result.success);
    assert_eq!(result.code, 0);
    assert!(result.message.starts_with("connection error: "));
    assert!(result.is_transport_error());
}

#[tokio::test]
async fn test_queue_worker_submits_in_background() {
    let server = MockServer::start().await;
    mount_status(&server, 200).await;

    let store = share(SqliteLogStore::open_in_memory(RetryPolicy::default()).unwrap());
    let notifier = std::sync::Arc::new(Notifier::new(
        store.clone(),
        create_submitter(&server, 10_000),
    ));

    let (queue, receiver) = NotificationQueue::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = spawn_worker(notifier, receiver, shutdown_rx);

    let request = SubmissionRequest::single(
        "https://example.com/news/7",
        Action::Create,
        Origin::record("news", 7),
    )
    .unwrap();
    queue.enqueue(request).unwrap();

    let mut logged = 0;
    for _ in 0..100 {
        logged = store
            .lock()
            .unwrap()
            .count_entries(&LogFilter::new())
            .unwrap();
        if logged > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(logged, 1);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .expect("Worker did not stop")
        .unwrap();

    let entries = store
        .lock()
        .unwrap()
        .list_entries(&LogFilter::new())
        .unwrap();
    assert_eq!(entries[0].status, SubmissionStatus::Success);
    assert_eq!(entries[0].action, Action::Create);
}

#[tokio::test]
async fn test_three_redirects_are_followed() {
    let server = MockServer::start().await;
    mount_redirect_chain(&server, 3).await;

    let submitter = create_submitter(&server, 10_000);
    let result = submitter
        .submit(&["https://example.com/a".to_string()])
        .await;

    assert_eq!(result, SubmissionResult::from_status(200));
    assert_eq!(server.received_requests().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_fourth_redirect_is_a_connection_error() {
    let server = MockServer::start().await;
    mount_redirect_chain(&server, 4).await;

    let submitter = create_submitter(&server, 10_000);
    let result = submitter
        .submit(&["https://example.com/a".to_string()])
        .await;

    assert!(!result.success);
    assert_eq!(result.code, 0);
    assert!(result.message.starts_with("connection error: "));
    assert!(result.is_transport_error());
}

#[tokio::test]
async fn test_chunks_are_spaced_by_batch_delay() {
    let server = MockServer::start().await;
    mount_status(&server, 200).await;

    let submitter = create_submitter_with_delay(&server, 10, Duration::from_millis(100));
    let started = Instant::now();
    let result = submitter.submit_batch(&site_urls(25)).await;
    let elapsed = started.elapsed();

    assert!(result.success);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert!(
        elapsed >= Duration::from_millis(200),
        "3 chunks finished after {:?}",
        elapsed
    );
}

#[tokio::test]
async fn test_table_submission_logs_every_url_as_manual() {
    let server = MockServer::start().await;
    mount_status(&server, 200).await;

    let store = share(SqliteLogStore::open_in_memory(RetryPolicy::default()).unwrap());
    let notifier = Notifier::new(store.clone(), create_submitter(&server, 10));

    let source = |table: &str| {
        (0..25)
            .map(|i| format!("https://{}/{}/{}", HOST, table, i))
            .collect::<Vec<_>>()
    };
    let filter = EventFilter::new(false, ["news"]);
    let request = table_request("news", &source, &filter, HOST).unwrap();
    let entries = notifier.notify(&request).await.unwrap();

    assert_eq!(entries.len(), 25);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    for entry in &entries {
        assert_eq!(entry.status, SubmissionStatus::Success);
        assert_eq!(entry.action, Action::Manual);
        assert_eq!(entry.origin, Origin::table("news"));
    }

    let manual = LogFilter::new().with_action(Action::Manual);
    assert_eq!(store.lock().unwrap().count_entries(&manual).unwrap(), 25);
}

#[tokio::test]
async fn test_queued_requests_are_submitted_on_shutdown() {
    let server = MockServer::start().await;
    Mock::given(path("/indexnow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let store = share(SqliteLogStore::open_in_memory(RetryPolicy::default()).unwrap());
    let notifier = std::sync::Arc::new(Notifier::new(
        store.clone(),
        create_submitter(&server, 10_000),
    ));

    let (queue, receiver) = NotificationQueue::channel(8);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = spawn_worker(notifier, receiver, shutdown_rx);

    for i in 0..5 {
        let request = SubmissionRequest::single(
            format!("https://example.com/news/{}", i),
            Action::Update,
            Origin::record("news", i + 1),
        )
        .unwrap();
        queue.enqueue(request).unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(10), worker)
        .await
        .expect("Worker did not stop")
        .unwrap();

    assert_eq!(server.received_requests().await.unwrap().len(), 5);
    let logged = store
        .lock()
        .unwrap()
        .count_entries(&LogFilter::new())
        .unwrap();
    assert_eq!(logged, 5);
    let late =
        SubmissionRequest::single("https://example.com/late", Action::Manual, Origin::none())
            .unwrap();
    assert!(matches!(queue.enqueue(late), Err(IndexNowError::QueueClosed)));
}
