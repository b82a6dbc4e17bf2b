//! Fixed-delay conversion service.
//!
//! Waits a configurable delay and then succeeds with a placeholder download
//! handle, mirroring a backend that is not wired up yet. Useful for demos and
//! for exercising the controller without a network. It can also be told to
//! fail every call with a given error.

use crate::error::ConversionError;
use crate::job::{DownloadHandle, ResultArtifact};
use crate::service::{ConversionRequest, ConversionService};
use futures::future::{BoxFuture, FutureExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Default simulated conversion time.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(2000);

pub struct SimulatedConversionService {
    delay: Duration,
    failure: Option<ConversionError>,
    calls: AtomicUsize,
}

impl Default for SimulatedConversionService {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl SimulatedConversionService {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every call fail with `error` after the delay.
    pub fn failing_with(mut self, error: ConversionError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConversionService for SimulatedConversionService {
    fn convert(
        &self,
        request: ConversionRequest,
    ) -> BoxFuture<'_, Result<ResultArtifact, ConversionError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        async move {
            tokio::time::sleep(self.delay).await;
            if let Some(error) = self.failure {
                debug!("Job {}: simulated failure {:?}", request.job_id, error);
                return Err(error);
            }
            let filename = request.result_filename();
            let handle = DownloadHandle::Url(format!("simulated://{}/{}", request.job_id, filename));
            Ok(ResultArtifact::new(filename, handle))
        }
        .boxed()
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
