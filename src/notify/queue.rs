//! Enqueue-and-return path for on-demand notifications
//!
//! Callers hand requests to a bounded channel and return immediately; a
//! single background worker drains the channel and runs the submissions.

use crate::notify::event::{ContentEvent, EventFilter, UrlResolver};
use crate::notify::notifier::{event_request, Notifier};
use crate::storage::LogStore;
use crate::submit::SubmissionRequest;
use crate::IndexNowError;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Sending side of the notification channel
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<SubmissionRequest>,
}

impl NotificationQueue {
    /// Creates a queue holding at most `capacity` pending requests
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SubmissionRequest>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Queues a request without waiting
    ///
    /// # Errors
    ///
    /// * `QueueFull` - the worker is behind and the queue is at capacity
    /// * `QueueClosed` - the worker has stopped
    pub fn enqueue(&self, request: SubmissionRequest) -> Result<(), IndexNowError> {
        self.sender.try_send(request).map_err(|e| match e {
            TrySendError::Full(_) => IndexNowError::QueueFull,
            TrySendError::Closed(_) => IndexNowError::QueueClosed,
        })
    }
}

/// Turns content events into queued requests
pub struct EventDispatcher {
    filter: EventFilter,
    resolver: Arc<dyn UrlResolver>,
    queue: NotificationQueue,
}

impl EventDispatcher {
    pub fn new(filter: EventFilter, resolver: Arc<dyn UrlResolver>, queue: NotificationQueue) -> Self {
        Self {
            filter,
            resolver,
            queue,
        }
    }

    /// Queues the URLs affected by `event`
    ///
    /// Returns `Ok(false)` when the event is filtered out or resolves to no URL.
    pub fn dispatch(&self, event: &ContentEvent) -> Result<bool, IndexNowError> {
        if !self.filter.accepts(event) {
            return Ok(false);
        }

        match event_request(event, self.resolver.as_ref()) {
            Some(request) => {
                self.queue.enqueue(request)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Starts the background worker that drains the queue
///
/// The worker stops taking new requests when `shutdown` turns true, when the
/// shutdown sender is dropped, or when every queue handle is dropped. Requests
/// already queued at that point are still submitted and logged before the
/// task ends.
pub fn spawn_worker<S>(
    notifier: Arc<Notifier<S>>,
    receiver: mpsc::Receiver<SubmissionRequest>,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    S: LogStore + Send + 'static,
{
    tokio::spawn(run(notifier, receiver, shutdown))
}

async fn run<S>(
    notifier: Arc<Notifier<S>>,
    mut receiver: mpsc::Receiver<SubmissionRequest>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: LogStore + Send + 'static,
{
    tracing::debug!("Notification worker started");

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            request = receiver.recv() => match request {
                Some(request) => process(&notifier, &request).await,
                None => break,
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    // Refuse new requests, then finish the ones already queued
    receiver.close();
    let mut drained = 0usize;
    while let Some(request) = receiver.recv().await {
        process(&notifier, &request).await;
        drained += 1;
    }
    if drained > 0 {
        tracing::info!("Submitted {} queued request(s) during shutdown", drained);
    }

    tracing::debug!("Notification worker stopped");
}

async fn process<S: LogStore>(notifier: &Notifier<S>, request: &SubmissionRequest) {
    if let Err(e) = notifier.notify(request).await {
        tracing::error!("Failed to log submission of {} URL(s): {}", request.len(), e);
    }
}
