//! Integration tests for the retry cycle
//!
//! A manual clock drives the retry schedule; wiremock plays the endpoint.

use chrono::{DateTime, Duration, TimeZone, Utc};
use indexnow_notify::clock::{Clock, ManualClock};
use indexnow_notify::config::EndpointConfig;
use indexnow_notify::notify::Notifier;
use indexnow_notify::retry::{RetryPolicy, RetryScheduler};
use indexnow_notify::storage::{
    share, LogEntry, LogFilter, LogStore, SharedStore, SqliteLogStore, StorageError,
    StorageResult,
};
use indexnow_notify::submit::{build_http_client, Origin};
use indexnow_notify::{Action, SubmissionRequest, SubmissionResult, SubmissionStatus, Submitter};
use std::sync::Arc;
use url::Url;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 8, 0, 0).unwrap()
}

fn create_submitter(server: &MockServer) -> Submitter {
    let client = build_http_client(&EndpointConfig::default()).expect("Failed to build client");
    let endpoint =
        Url::parse(&format!("{}/indexnow", server.uri())).expect("Failed to parse endpoint");
    Submitter::new(client, endpoint, "example.com", "0123456789abcdef")
}

/// Store, notifier and scheduler sharing one manual clock
struct Harness<S: LogStore> {
    clock: ManualClock,
    store: SharedStore<S>,
    notifier: Notifier<S>,
    scheduler: RetryScheduler<S>,
}

fn create_harness(server: &MockServer, policy: RetryPolicy) -> Harness<SqliteLogStore> {
    let clock = ManualClock::new(start_time());
    let store = SqliteLogStore::open_in_memory(policy)
        .unwrap()
        .with_clock(Arc::new(clock.clone()));
    wire_harness(server, clock, store, policy)
}

fn wire_harness<S: LogStore>(
    server: &MockServer,
    clock: ManualClock,
    store: S,
    policy: RetryPolicy,
) -> Harness<S> {
    let store = share(store);
    let notifier = Notifier::new(store.clone(), create_submitter(server));
    let scheduler = RetryScheduler::new(store.clone(), create_submitter(server), policy)
        .with_clock(Arc::new(clock.clone()));

    Harness {
        clock,
        store,
        notifier,
        scheduler,
    }
}

impl<S: LogStore> Harness<S> {
    async fn submit(&self, url: &str) -> LogEntry {
        let request = SubmissionRequest::single(url, Action::Update, Origin::record("pages", 2))
            .unwrap();
        self.notifier.notify(&request).await.unwrap().remove(0)
    }

    fn entry(&self, id: i64) -> LogEntry {
        self.store.lock().unwrap().get_entry(id).unwrap()
    }
}

async fn mount_status(server: &MockServer, status: u16, times: Option<u64>) {
    let mock = Mock::given(path("/indexnow")).respond_with(ResponseTemplate::new(status));
    let mock = match times {
        Some(n) => mock.up_to_n_times(n),
        None => mock,
    };
    mock.mount(server).await;
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

#[tokio::test]
async fn test_unavailable_then_success_after_interval() {
    let server = MockServer::start().await;
    mount_status(&server, 503, Some(1)).await;
    mount_status(&server, 200, None).await;

    let harness = create_harness(&server, RetryPolicy::default());
    let entry = harness.submit("https://example.com/about").await;

    assert_eq!(entry.status, SubmissionStatus::Failed);
    assert_eq!(entry.attempts, 1);
    assert_eq!(entry.next_retry, Some(start_time() + Duration::hours(12)));

    // Not due yet
    let report = harness.scheduler.sweep().await.unwrap();
    assert!(report.is_empty());
    assert_eq!(request_count(&server).await, 1);

    harness.clock.advance(Duration::hours(12));
    let report = harness.scheduler.sweep().await.unwrap();
    assert_eq!(report.selected, 1);
    assert_eq!(report.succeeded, 1);

    let entry = harness.entry(entry.id);
    assert_eq!(entry.status, SubmissionStatus::Success);
    assert_eq!(entry.attempts, 2);
    assert_eq!(entry.response_code, Some(200));
    assert_eq!(entry.next_retry, None);
    assert_eq!(entry.action, Action::Update);
    assert_eq!(entry.last_attempt, Some(start_time() + Duration::hours(12)));
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_forbidden_is_never_retried() {
    let server = MockServer::start().await;
    mount_status(&server, 403, None).await;

    let harness = create_harness(&server, RetryPolicy::default());
    let entry = harness.submit("https://example.com/about").await;

    assert_eq!(entry.status, SubmissionStatus::PermanentFail);
    assert_eq!(entry.next_retry, None);

    harness.clock.advance(Duration::days(3));
    let report = harness.scheduler.sweep().await.unwrap();

    assert!(report.is_empty());
    assert_eq!(request_count(&server).await, 1);
    assert_eq!(harness.entry(entry.id).attempts, 1);
}

#[tokio::test]
async fn test_permanent_code_during_retry_is_terminal() {
    let server = MockServer::start().await;
    mount_status(&server, 500, Some(1)).await;
    mount_status(&server, 422, None).await;

    let harness = create_harness(&server, RetryPolicy::default());
    let entry = harness.submit("https://example.com/about").await;

    harness.clock.advance(Duration::hours(12));
    let report = harness.scheduler.sweep().await.unwrap();
    assert_eq!(report.permanent, 1);

    let entry = harness.entry(entry.id);
    assert_eq!(entry.status, SubmissionStatus::PermanentFail);
    assert_eq!(entry.attempts, 2);
    assert_eq!(entry.next_retry, None);

    harness.clock.advance(Duration::hours(12));
    assert!(harness.scheduler.sweep().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_exhaustion_after_max_attempts() {
    let server = MockServer::start().await;
    mount_status(&server, 500, None).await;

    let harness = create_harness(&server, RetryPolicy::default());
    let entry = harness.submit("https://example.com/about").await;

    let mut previous_attempts = entry.attempts;
    for round in 1..=4 {
        harness.clock.advance(Duration::hours(12));
        let report = harness.scheduler.sweep().await.unwrap();
        assert_eq!(report.selected, 1);

        let current = harness.entry(entry.id);
        assert_eq!(current.attempts, previous_attempts + 1);
        previous_attempts = current.attempts;

        if round < 4 {
            assert_eq!(current.status, SubmissionStatus::Failed);
            assert_eq!(report.rescheduled, 1);
            assert_eq!(
                current.next_retry,
                Some(harness.clock.now() + Duration::hours(12))
            );
        } else {
            assert_eq!(report.exhausted, 1);
        }
    }

    let entry = harness.entry(entry.id);
    assert_eq!(entry.status, SubmissionStatus::PermanentFail);
    assert_eq!(entry.attempts, 5);
    assert_eq!(entry.next_retry, None);

    harness.clock.advance(Duration::hours(12));
    assert!(harness.scheduler.sweep().await.unwrap().is_empty());
    assert_eq!(request_count(&server).await, 5);
}

#[tokio::test]
async fn test_selection_is_idempotent_between_sweeps() {
    let server = MockServer::start().await;
    mount_status(&server, 429, None).await;

    let harness = create_harness(&server, RetryPolicy::default());
    harness.submit("https://example.com/a").await;
    harness.submit("https://example.com/b").await;
    harness.clock.advance(Duration::hours(12));

    let first = harness
        .store
        .lock()
        .unwrap()
        .select_due_for_retry(5, 100)
        .unwrap();
    let second = harness
        .store
        .lock()
        .unwrap()
        .select_due_for_retry(5, 100)
        .unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_sweep_limit_caps_entries_per_sweep() {
    let server = MockServer::start().await;
    mount_status(&server, 503, None).await;

    let policy = RetryPolicy {
        sweep_limit: 2,
        ..RetryPolicy::default()
    };
    let harness = create_harness(&server, policy);
    for path in ["a", "b", "c"] {
        harness.submit(&format!("https://example.com/{}", path)).await;
    }

    harness.clock.advance(Duration::hours(12));
    let report = harness.scheduler.sweep().await.unwrap();
    assert_eq!(report.selected, 2);
}

#[tokio::test]
async fn test_disabled_retry_is_a_no_op() {
    let server = MockServer::start().await;
    mount_status(&server, 503, None).await;

    let harness = create_harness(&server, RetryPolicy::disabled());
    let entry = harness.submit("https://example.com/about").await;

    assert_eq!(entry.status, SubmissionStatus::Failed);
    assert_eq!(entry.next_retry, None);

    harness.clock.advance(Duration::days(1));
    let report = harness.scheduler.sweep().await.unwrap();

    assert!(report.is_empty());
    assert_eq!(request_count(&server).await, 1);
    assert_eq!(harness.entry(entry.id).attempts, 1);
}

/// Delegates to SQLite but refuses to update one entry
struct FailingUpdateStore {
    inner: SqliteLogStore,
    broken_id: Option<i64>,
}

impl LogStore for FailingUpdateStore {
    fn append(
        &mut self,
        url: &str,
        action: Action,
        origin: &Origin,
        result: &SubmissionResult,
    ) -> StorageResult<LogEntry> {
        self.inner.append(url, action, origin, result)
    }

    fn update(
        &mut self,
        id: i64,
        status: SubmissionStatus,
        result: &SubmissionResult,
        attempts: u32,
        next_retry: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        if self.broken_id == Some(id) {
            return Err(StorageError::Database("disk I/O error".to_string()));
        }
        self.inner.update(id, status, result, attempts, next_retry)
    }

    fn select_due_for_retry(&self, max_attempts: u32, limit: usize) -> StorageResult<Vec<LogEntry>> {
        self.inner.select_due_for_retry(max_attempts, limit)
    }

    fn get_entry(&self, id: i64) -> StorageResult<LogEntry> {
        self.inner.get_entry(id)
    }

    fn list_entries(&self, filter: &LogFilter) -> StorageResult<Vec<LogEntry>> {
        self.inner.list_entries(filter)
    }

    fn count_entries(&self, filter: &LogFilter) -> StorageResult<u64> {
        self.inner.count_entries(filter)
    }

    fn count_by_status_since(
        &self,
        statuses: &[SubmissionStatus],
        since: Option<DateTime<Utc>>,
    ) -> StorageResult<u64> {
        self.inner.count_by_status_since(statuses, since)
    }

    fn delete_created_before(&mut self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        self.inner.delete_created_before(cutoff)
    }
}

#[tokio::test]
async fn test_one_failing_entry_does_not_abort_sweep() {
    let server = MockServer::start().await;
    mount_status(&server, 503, Some(2)).await;
    mount_status(&server, 200, None).await;

    let clock = ManualClock::new(start_time());
    let inner = SqliteLogStore::open_in_memory(RetryPolicy::default())
        .unwrap()
        .with_clock(Arc::new(clock.clone()));
    let store = FailingUpdateStore {
        inner,
        broken_id: None,
    };
    let harness = wire_harness(&server, clock, store, RetryPolicy::default());

    let first = harness.submit("https://example.com/a").await;
    harness.clock.advance(Duration::seconds(1));
    let second = harness.submit("https://example.com/b").await;
    harness.store.lock().unwrap().broken_id = Some(first.id);

    harness.clock.advance(Duration::hours(12));
    let report = harness.scheduler.sweep().await.unwrap();

    assert_eq!(report.selected, 2);
    assert_eq!(report.errors, 1);
    assert_eq!(report.succeeded, 1);

    assert_eq!(harness.entry(first.id).status, SubmissionStatus::Failed);
    assert_eq!(harness.entry(first.id).attempts, 1);
    assert_eq!(harness.entry(second.id).status, SubmissionStatus::Success);
}

#[tokio::test]
async fn test_connection_failures_are_retried() {
    let clock = ManualClock::new(start_time());
    let store = share(
        SqliteLogStore::open_in_memory(RetryPolicy::default())
            .unwrap()
            .with_clock(Arc::new(clock.clone())),
    );

    let client = build_http_client(&EndpointConfig::default()).unwrap();
    let endpoint = Url::parse("http://127.0.0.1:1/indexnow").unwrap();
    let submitter = Submitter::new(client, endpoint, "example.com", "0123456789abcdef");

    let notifier = Notifier::new(store.clone(), submitter.clone());
    let scheduler = RetryScheduler::new(store.clone(), submitter, RetryPolicy::default())
        .with_clock(Arc::new(clock.clone()));

    let request =
        SubmissionRequest::single("https://example.com/a", Action::Delete, Origin::none()).unwrap();
    let entry = notifier.notify(&request).await.unwrap().remove(0);
    assert_eq!(entry.status, SubmissionStatus::Failed);
    assert_eq!(entry.response_code, Some(0));

    clock.advance(Duration::hours(12));
    let report = scheduler.sweep().await.unwrap();
    assert_eq!(report.rescheduled, 1);

    let entry = store.lock().unwrap().get_entry(entry.id).unwrap();
    assert_eq!(entry.attempts, 2);
    assert_eq!(entry.status, SubmissionStatus::Failed);
    assert_eq!(entry.next_retry, Some(clock.now() + Duration::hours(12)));
}
