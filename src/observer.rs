//! Observer trait for workflow events.
//!
//! Inject an [`Arc<dyn WorkflowObserver>`] via
//! [`crate::config::WorkflowConfigBuilder::observer`] to receive events as the
//! controller moves through its states. The presentation layer can use it to
//! re-render, the CLI uses it to drive a spinner.
//!
//! # Example
//!
//! ```rust
//! use pdf2sheet::{JobId, JobStatus, WorkflowConfig, WorkflowObserver};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingObserver {
//!     transitions: AtomicUsize,
//! }
//!
//! impl WorkflowObserver for CountingObserver {
//!     fn on_status_change(&self, _job: Option<JobId>, _from: JobStatus, _to: JobStatus) {
//!         self.transitions.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let observer = Arc::new(CountingObserver { transitions: AtomicUsize::new(0) });
//! let config = WorkflowConfig::builder()
//!     .observer(observer as Arc<dyn WorkflowObserver>)
//!     .build()
//!     .unwrap();
//! ```

use crate::job::{JobId, JobStatus};
use crate::notify::Notification;
use std::sync::Arc;

/// Called by the controller on every observable event.
///
/// All methods default to no-ops so implementors only override what they
/// need. Callbacks run synchronously inside the controller command that
/// caused them and must not block.
pub trait WorkflowObserver: Send + Sync {
    /// The workflow status changed. `job` is the job involved, if any.
    fn on_status_change(&self, job: Option<JobId>, from: JobStatus, to: JobStatus) {
        let _ = (job, from, to);
    }

    /// A request was handed to the conversion service.
    fn on_request_dispatched(&self, job: JobId) {
        let _ = job;
    }

    /// A notification was published (replacing any previous one).
    fn on_notification(&self, notification: &Notification) {
        let _ = notification;
    }

    /// The active notification was dismissed.
    fn on_notification_dismissed(&self) {}

    /// A reply arrived for a job that is no longer active and was dropped.
    fn on_stale_reply(&self, job: JobId) {
        let _ = job;
    }
}

/// An observer that ignores everything. Used when none is configured.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::WorkflowConfig`].
pub type SharedObserver = Arc<dyn WorkflowObserver>;
