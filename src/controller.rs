//! The conversion job controller: the workflow's only state machine.
//!
//! ## States
//!
//! ```text
//!            select_file            convert                 (dispatch)
//!   Idle ───────────────▶ FileSelected ───────▶ Submitted ───────────▶ InProgress
//!    ▲                        ▲  ▲                                      │      │
//!    │ remove_file            │  └──── select_file (any state) ─────────┤      │
//!    └────────────────────────┴──── remove_file (any state) ────────────┘      │
//!                                                                    reply ok  │ reply err
//!                                                               Completed ◀────┴────▶ Failed
//! ```
//!
//! ## Cancellation
//!
//! There is no remote abort. The controller keeps an explicit
//! `active_job` id; selecting or removing a file clears it, and a reply is
//! only accepted when its job id equals `active_job` at the moment it is
//! applied. Everything else is a stale reply and is dropped silently. All
//! mutation goes through `&mut self`, so supersession and reply handling can
//! never interleave.
//!
//! ## Driving replies
//!
//! Service calls run on their own tasks, see `service::dispatch`.
//! Their replies queue up on a channel until the owner of the controller
//! applies them with [`ConversionController::next_reply`],
//! [`ConversionController::apply_pending`] or
//! [`ConversionController::wait_until_settled`].

use crate::auth::{self, AuthGate};
use crate::config::WorkflowConfig;
use crate::error::{ConversionError, WorkflowError};
use crate::intake::{self, Document, DocumentSummary, FileCandidate};
use crate::job::{ConversionJob, JobId, JobStatus, ResultArtifact};
use crate::notify::{Notification, NotificationChannel, NotificationKind};
use crate::observer::{NoopObserver, SharedObserver};
use crate::service::{self, ConversionReply, ConversionRequest, ConversionService};
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

/// Answer to a [`ConversionController::convert`] command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertAck {
    /// A new job was created and handed to the service.
    Started(JobId),
    /// A job is already submitted or in progress; nothing was done.
    AlreadyInFlight(JobId),
    /// No document is selected; nothing was done.
    NothingSelected,
}

/// What happened to a service reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// The reply belonged to the active job, which is now in this status.
    Accepted(JobStatus),
    /// The job was superseded before the reply arrived; it was dropped.
    Stale(JobId),
}

/// Read-only projection of the workflow for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub status: JobStatus,
    pub job_id: Option<JobId>,
    pub document: Option<DocumentSummary>,
    pub result: Option<ResultArtifact>,
    pub error: Option<ConversionError>,
    pub notification: Option<Notification>,
}

/// What the controller currently holds.
#[derive(Debug)]
enum Slot {
    Idle,
    Selected(Document),
    Job(ConversionJob),
}

impl Slot {
    fn status(&self) -> JobStatus {
        match self {
            Slot::Idle => JobStatus::Idle,
            Slot::Selected(_) => JobStatus::FileSelected,
            Slot::Job(job) => job.status(),
        }
    }

    fn job_id(&self) -> Option<JobId> {
        match self {
            Slot::Job(job) => Some(job.id()),
            _ => None,
        }
    }
}

/// Owns the document, the current job and the notification slot.
pub struct ConversionController {
    config: WorkflowConfig,
    service: Arc<dyn ConversionService>,
    auth: Arc<dyn AuthGate>,
    observer: SharedObserver,
    runtime: Handle,
    notifications: NotificationChannel,
    slot: Slot,
    /// The only job whose reply may be accepted.
    active_job: Option<JobId>,
    /// Intake or auth error not attached to any job.
    boundary_error: Option<ConversionError>,
    outstanding: usize,
    replies_tx: UnboundedSender<ConversionReply>,
    replies_rx: UnboundedReceiver<ConversionReply>,
}

impl ConversionController {
    /// Enter the workflow.
    ///
    /// The auth gate is checked before any state is created; a denied caller
    /// gets [`WorkflowError::Unauthorized`] carrying the redirect target.
    /// Must be called from within a Tokio runtime, which is used to run
    /// service calls.
    pub fn enter(
        config: WorkflowConfig,
        service: Arc<dyn ConversionService>,
        auth: Arc<dyn AuthGate>,
    ) -> Result<Self, WorkflowError> {
        auth::admit(auth.as_ref())?;

        let runtime = Handle::try_current().map_err(|e| {
            WorkflowError::Internal(format!("controller needs a Tokio runtime: {e}"))
        })?;

        let observer = config
            .observer
            .clone()
            .unwrap_or_else(|| Arc::new(NoopObserver) as SharedObserver);
        let notifications = NotificationChannel::new(config.notification_ttl());
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();

        debug!("Entered conversion workflow using {}", service.name());
        Ok(Self {
            config,
            service,
            auth,
            observer,
            runtime,
            notifications,
            slot: Slot::Idle,
            active_job: None,
            boundary_error: None,
            outstanding: 0,
            replies_tx,
            replies_rx,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn status(&self) -> JobStatus {
        self.slot.status()
    }

    /// The selected document, whether or not a job was started for it.
    pub fn document(&self) -> Option<&Document> {
        match &self.slot {
            Slot::Idle => None,
            Slot::Selected(doc) => Some(doc),
            Slot::Job(job) => Some(job.source_document()),
        }
    }

    pub fn job(&self) -> Option<&ConversionJob> {
        match &self.slot {
            Slot::Job(job) => Some(job),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&ResultArtifact> {
        self.job().and_then(|job| job.result())
    }

    /// The most recent error: an intake/auth rejection raised after the
    /// job settled takes precedence over the job's own error.
    pub fn error(&self) -> Option<ConversionError> {
        self.boundary_error
            .or_else(|| self.job().and_then(ConversionJob::error))
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notifications.current()
    }

    /// Requests handed to the service whose replies have not been applied yet.
    pub fn outstanding_requests(&self) -> usize {
        self.outstanding
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            status: self.status(),
            job_id: self.slot.job_id(),
            document: self.document().map(Document::summary),
            result: self.result().cloned(),
            error: self.error(),
            notification: self.notification().cloned(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────────

    /// Validate and select a file.
    ///
    /// On success any previous job is superseded, the previous result and
    /// error are cleared and the notification is dismissed. On rejection the
    /// current state is kept and an error notification is published.
    pub fn select_file(
        &mut self,
        candidate: FileCandidate,
    ) -> Result<DocumentSummary, ConversionError> {
        match intake::validate(candidate, &self.config) {
            Ok(document) => {
                let summary = document.summary();
                info!(
                    "Selected '{}' ({})",
                    summary.name, summary.size_display
                );
                self.supersede("new file selected");
                self.boundary_error = None;
                self.dismiss_notification();
                self.set_slot(Slot::Selected(document));
                Ok(summary)
            }
            Err(error) => {
                info!("File rejected: {}", error);
                self.boundary_error = Some(error);
                self.publish(error.to_string(), NotificationKind::Error);
                Err(error)
            }
        }
    }

    /// Drop the selected file and whatever job was running for it.
    pub fn remove_file(&mut self) {
        self.supersede("file removed");
        self.boundary_error = None;
        self.set_slot(Slot::Idle);
    }

    /// Back to a blank workflow, notification included.
    pub fn reset(&mut self) {
        self.supersede("workflow reset");
        self.boundary_error = None;
        self.dismiss_notification();
        self.set_slot(Slot::Idle);
    }

    /// Start converting the selected document.
    ///
    /// Idempotent while a job is in flight. From `Completed` or `Failed`
    /// a fresh job is created for the same document. Refuses with
    /// `AuthExpired` when the session is no longer valid; a job already in
    /// flight keeps running and its reply is still applied.
    pub fn convert(&mut self) -> Result<ConvertAck, ConversionError> {
        if let Some(id) = self.active_job {
            self.check_session()?;
            debug!("Job {}: convert ignored, already in flight", id);
            return Ok(ConvertAck::AlreadyInFlight(id));
        }

        let document = match &self.slot {
            Slot::Idle => return Ok(ConvertAck::NothingSelected),
            Slot::Selected(doc) => doc.clone(),
            Slot::Job(job) => job.source_document().clone(),
        };

        self.check_session()?;

        let job = ConversionJob::submit(document.clone());
        let id = job.id();
        info!("Job {}: submitting '{}'", id, document.name());

        self.active_job = Some(id);
        self.boundary_error = None;
        self.dismiss_notification();
        self.set_slot(Slot::Job(job));

        let request = ConversionRequest {
            job_id: id,
            document,
            output_extension: self.config.output_extension.clone(),
        };
        service::dispatch(
            &self.runtime,
            Arc::clone(&self.service),
            request,
            self.config.service_timeout(),
            self.replies_tx.clone(),
        );
        self.outstanding += 1;
        self.observer.on_request_dispatched(id);
        self.set_job_status(JobStatus::InProgress);

        Ok(ConvertAck::Started(id))
    }

    pub fn dismiss_notification(&mut self) {
        if self.notifications.dismiss() {
            self.observer.on_notification_dismissed();
        }
    }

    // ── Replies ──────────────────────────────────────────────────────────

    /// Wait for the next service reply and apply it.
    ///
    /// Returns `None` immediately when no request is outstanding.
    pub async fn next_reply(&mut self) -> Option<ReplyDisposition> {
        if self.outstanding == 0 {
            return None;
        }
        let reply = self.replies_rx.recv().await?;
        Some(self.apply_reply(reply))
    }

    /// Apply every reply that has already arrived, without waiting.
    pub fn apply_pending(&mut self) -> Vec<ReplyDisposition> {
        let mut applied = Vec::new();
        while let Ok(reply) = self.replies_rx.try_recv() {
            applied.push(self.apply_reply(reply));
        }
        applied
    }

    /// Apply replies until the current job is no longer in flight.
    pub async fn wait_until_settled(&mut self) -> JobStatus {
        while self.status().is_active() {
            if self.next_reply().await.is_none() {
                break;
            }
        }
        self.status()
    }

    fn apply_reply(&mut self, reply: ConversionReply) -> ReplyDisposition {
        self.outstanding = self.outstanding.saturating_sub(1);
        let id = reply.job_id;

        let job = match &mut self.slot {
            Slot::Job(job) if self.active_job == Some(id) && job.id() == id => job,
            _ => {
                debug!("Job {}: discarding stale reply", id);
                self.observer.on_stale_reply(id);
                return ReplyDisposition::Stale(id);
            }
        };

        self.active_job = None;
        self.boundary_error = None;
        let (status, text, kind) = match reply.outcome {
            Ok(artifact) => {
                info!("Job {}: completed → {}", id, artifact.filename);
                let text = format!(
                    "Converted {} to {}",
                    job.source_document().name(),
                    artifact.filename
                );
                job.result = Some(artifact);
                (JobStatus::Completed, text, NotificationKind::Success)
            }
            Err(error) => {
                warn!("Job {}: failed: {}", id, error);
                job.error = Some(error);
                (JobStatus::Failed, error.to_string(), NotificationKind::Error)
            }
        };

        self.set_job_status(status);
        self.publish(text, kind);
        ReplyDisposition::Accepted(status)
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn check_session(&mut self) -> Result<(), ConversionError> {
        if self.auth.is_authorized() {
            return Ok(());
        }
        self.auth.on_unauthorized();
        let error = ConversionError::AuthExpired;
        warn!("Convert refused: {}", error);
        self.boundary_error = Some(error);
        self.publish(error.to_string(), NotificationKind::Error);
        Err(error)
    }

    fn supersede(&mut self, reason: &str) {
        if let Some(id) = self.active_job.take() {
            debug!("Job {}: superseded ({})", id, reason);
        }
    }

    fn set_slot(&mut self, next: Slot) {
        let from = self.slot.status();
        let job = next.job_id().or_else(|| self.slot.job_id());
        self.slot = next;
        self.emit_status(job, from);
    }

    fn set_job_status(&mut self, status: JobStatus) {
        if let Slot::Job(job) = &mut self.slot {
            let from = job.status;
            job.status = status;
            let id = job.id();
            self.emit_status(Some(id), from);
        }
    }

    fn emit_status(&self, job: Option<JobId>, from: JobStatus) {
        let to = self.slot.status();
        if from != to {
            debug!("Status {} → {}", from, to);
            self.observer.on_status_change(job, from, to);
        }
    }

    fn publish(&mut self, text: String, kind: NotificationKind) {
        let notification = self.notifications.publish(text, kind);
        self.observer.on_notification(notification);
    }
}
