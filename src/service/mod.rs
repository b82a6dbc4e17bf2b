//! Conversion service contract and the dispatcher that drives it.
//!
//! The byte-level PDF → spreadsheet transformation happens behind the
//! [`ConversionService`] trait. The controller never awaits a service
//! directly: [`dispatch`] runs the call on its own task, bounds it with the
//! configured timeout, and posts exactly one [`ConversionReply`] tagged with
//! the job id back to the controller.
//!
//! ```text
//! controller ──request{job_id, document}──▶ dispatch task ──▶ service
//!      ▲                                          │
//!      └──────────reply{job_id, outcome}──────────┘  (mpsc, exactly once)
//! ```
//!
//! Implementations:
//! 1. [`http`]: POSTs the PDF to a remote converter over HTTP
//! 2. [`simulated`]: fixed-delay stand-in used by the CLI demo mode

pub mod http;
pub mod simulated;

use crate::error::ConversionError;
use crate::intake::{result_filename, Document};
use crate::job::{JobId, ResultArtifact};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// What the controller hands to a service.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub job_id: JobId,
    pub document: Document,
    /// Spreadsheet extension to name the result with, e.g. `xlsx`.
    pub output_extension: String,
}

impl ConversionRequest {
    /// File name the produced artifact must carry.
    pub fn result_filename(&self) -> String {
        result_filename(self.document.name(), &self.output_extension)
    }
}

/// What comes back to the controller, once per request.
#[derive(Debug, Clone)]
pub struct ConversionReply {
    pub job_id: JobId,
    pub outcome: Result<ResultArtifact, ConversionError>,
}

/// Performs the actual document conversion.
///
/// A failed call must resolve to one of the service errors
/// (`ServiceUnavailable`, `ServiceTimeout`, `MalformedResult`) or
/// `AuthExpired` when the backend rejects the session.
pub trait ConversionService: Send + Sync {
    fn convert(
        &self,
        request: ConversionRequest,
    ) -> BoxFuture<'_, Result<ResultArtifact, ConversionError>>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "conversion-service"
    }
}

/// Run one request against `service` and post its reply to `replies`.
///
/// The reply is sent exactly once: a call exceeding `timeout` resolves to
/// `ServiceTimeout`, a call that panics resolves to `ServiceUnavailable`.
/// The service is not interrupted on timeout; its eventual answer is dropped.
pub(crate) fn dispatch(
    runtime: &Handle,
    service: Arc<dyn ConversionService>,
    request: ConversionRequest,
    timeout: Duration,
    replies: UnboundedSender<ConversionReply>,
) -> JoinHandle<()> {
    let inner = runtime.clone();
    runtime.spawn(async move {
        let job_id = request.job_id;
        let name = service.name().to_string();
        debug!("Job {}: calling {}", job_id, name);

        let call = inner.spawn(async move { service.convert(request).await });
        let outcome = match tokio::time::timeout(timeout, call).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!("Job {}: {} task failed: {}", job_id, name, e);
                Err(ConversionError::ServiceUnavailable)
            }
            Err(_) => {
                warn!("Job {}: {} timed out after {:?}", job_id, name, timeout);
                Err(ConversionError::ServiceTimeout)
            }
        };

        if replies.send(ConversionReply { job_id, outcome }).is_err() {
            debug!("Job {}: controller gone, reply dropped", job_id);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkflowConfig;
    use crate::intake::{validate, FileCandidate};
    use crate::job::DownloadHandle;
    use futures::FutureExt;
    use tokio::sync::mpsc;

    struct PanickingService;

    impl ConversionService for PanickingService {
        fn convert(
            &self,
            _request: ConversionRequest,
        ) -> BoxFuture<'_, Result<ResultArtifact, ConversionError>> {
            futures::future::lazy(|_| -> Result<ResultArtifact, ConversionError> {
                panic!("converter crashed")
            })
            .boxed()
        }
    }

    struct SlowService;

    impl ConversionService for SlowService {
        fn convert(
            &self,
            request: ConversionRequest,
        ) -> BoxFuture<'_, Result<ResultArtifact, ConversionError>> {
            async move {
                tokio::time::sleep(Duration::from_secs(600)).await;
                Ok(ResultArtifact::new(
                    request.result_filename(),
                    DownloadHandle::Url("late".into()),
                ))
            }
            .boxed()
        }
    }

    fn request() -> ConversionRequest {
        let doc = validate(
            FileCandidate::new("report.pdf", "application/pdf", &b"%PDF"[..]),
            &WorkflowConfig::default(),
        )
        .unwrap();
        ConversionRequest {
            job_id: JobId::new(),
            document: doc,
            output_extension: "xlsx".into(),
        }
    }

    #[test]
    fn request_names_result_after_document() {
        assert_eq!(request().result_filename(), "report.xlsx");
    }

    #[tokio::test]
    async fn panicking_service_resolves_unavailable() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let req = request();
        let id = req.job_id;
        dispatch(
            &Handle::current(),
            Arc::new(PanickingService),
            req,
            Duration::from_secs(5),
            tx,
        );

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.job_id, id);
        assert_eq!(reply.outcome.unwrap_err(), ConversionError::ServiceUnavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_service_resolves_timeout_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatch(
            &Handle::current(),
            Arc::new(SlowService),
            request(),
            Duration::from_secs(1),
            tx,
        );

        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.outcome.unwrap_err(), ConversionError::ServiceTimeout);
        // The sender was moved into the dispatch task, so the channel closes
        // after the single reply.
        assert!(rx.recv().await.is_none());
    }
}
