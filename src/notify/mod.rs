//! Notification module: from content changes to logged submissions
//!
//! # Components
//!
//! - `ContentEvent`, `EventFilter` and the `UrlResolver` and `TableUrlSource`
//!   collaborators
//! - `Notifier`: submits a request and logs each URL
//! - `NotificationQueue` and its background worker

mod event;
mod notifier;
mod queue;

pub use event::{ContentEvent, ContentEventKind, EventFilter, TableUrlSource, UrlResolver};
pub use notifier::{event_request, manual_request, table_request, Notifier};
pub use queue::{spawn_worker, EventDispatcher, NotificationQueue};
