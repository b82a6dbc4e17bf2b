//! Configuration types for the conversion workflow.
//!
//! Every workflow knob lives in [`WorkflowConfig`], built via its
//! [`WorkflowConfigBuilder`]. The HTTP conversion service carries its own
//! [`crate::service::http::HttpServiceConfig`] since it is optional.

use crate::error::WorkflowError;
use crate::observer::WorkflowObserver;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default upload limit: 10 MB.
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10_000_000;

/// Media type accepted by intake.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Configuration for a [`crate::controller::ConversionController`].
///
/// # Example
/// ```rust
/// use pdf2sheet::WorkflowConfig;
///
/// let config = WorkflowConfig::builder()
///     .max_file_size_bytes(5_000_000)
///     .service_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.output_extension, "xlsx");
/// ```
#[derive(Clone)]
pub struct WorkflowConfig {
    /// Largest accepted upload in bytes. Default: 10 000 000.
    ///
    /// Candidates strictly larger than this are rejected with
    /// [`crate::ConversionError::FileTooLarge`].
    pub max_file_size_bytes: u64,

    /// Declared media type a candidate must carry. Default: `application/pdf`.
    pub accepted_media_type: String,

    /// Also require the content to start with the `%PDF` signature. Default: false.
    pub require_pdf_signature: bool,

    /// Extension of the produced spreadsheet, without the dot. Default: `xlsx`.
    pub output_extension: String,

    /// How long the controller waits for a service reply. Default: 60.
    ///
    /// On expiry the job fails with [`crate::ConversionError::ServiceTimeout`];
    /// the service itself is not told to stop.
    pub service_timeout_secs: u64,

    /// Lifetime of a published notification in milliseconds. Default: 5000.
    /// `None` keeps messages until dismissed or replaced.
    pub notification_ttl_ms: Option<u64>,

    /// Receives status, notification and stale-reply events.
    pub observer: Option<Arc<dyn WorkflowObserver>>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            accepted_media_type: PDF_MEDIA_TYPE.to_string(),
            require_pdf_signature: false,
            output_extension: "xlsx".to_string(),
            service_timeout_secs: 60,
            notification_ttl_ms: Some(5000),
            observer: None,
        }
    }
}

impl fmt::Debug for WorkflowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowConfig")
            .field("max_file_size_bytes", &self.max_file_size_bytes)
            .field("accepted_media_type", &self.accepted_media_type)
            .field("require_pdf_signature", &self.require_pdf_signature)
            .field("output_extension", &self.output_extension)
            .field("service_timeout_secs", &self.service_timeout_secs)
            .field("notification_ttl_ms", &self.notification_ttl_ms)
            .field(
                "observer",
                &self.observer.as_ref().map(|_| "<dyn WorkflowObserver>"),
            )
            .finish()
    }
}

impl WorkflowConfig {
    /// Create a new builder for `WorkflowConfig`.
    pub fn builder() -> WorkflowConfigBuilder {
        WorkflowConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn service_timeout(&self) -> Duration {
        Duration::from_secs(self.service_timeout_secs)
    }

    pub fn notification_ttl(&self) -> Option<Duration> {
        self.notification_ttl_ms.map(Duration::from_millis)
    }
}

/// Builder for [`WorkflowConfig`].
pub struct WorkflowConfigBuilder {
    config: WorkflowConfig,
}

impl WorkflowConfigBuilder {
    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_size_bytes = bytes;
        self
    }

    pub fn accepted_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.config.accepted_media_type = media_type.into();
        self
    }

    pub fn require_pdf_signature(mut self, v: bool) -> Self {
        self.config.require_pdf_signature = v;
        self
    }

    /// Set the output extension; a leading dot is stripped.
    pub fn output_extension(mut self, ext: impl Into<String>) -> Self {
        let ext: String = ext.into();
        self.config.output_extension = ext.trim_start_matches('.').to_string();
        self
    }

    pub fn service_timeout_secs(mut self, secs: u64) -> Self {
        self.config.service_timeout_secs = secs;
        self
    }

    pub fn notification_ttl_ms(mut self, ms: Option<u64>) -> Self {
        self.config.notification_ttl_ms = ms;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorkflowConfig, WorkflowError> {
        let c = &self.config;
        if c.max_file_size_bytes == 0 {
            return Err(WorkflowError::InvalidConfig(
                "Maximum file size must be ≥ 1 byte".into(),
            ));
        }
        if c.service_timeout_secs == 0 {
            return Err(WorkflowError::InvalidConfig(
                "Service timeout must be ≥ 1 second".into(),
            ));
        }
        if c.output_extension.is_empty() {
            return Err(WorkflowError::InvalidConfig(
                "Output extension must not be empty".into(),
            ));
        }
        if c.accepted_media_type.trim().is_empty() {
            return Err(WorkflowError::InvalidConfig(
                "Accepted media type must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_limits() {
        let c = WorkflowConfig::default();
        assert_eq!(c.max_file_size_bytes, 10_000_000);
        assert_eq!(c.accepted_media_type, "application/pdf");
        assert_eq!(c.output_extension, "xlsx");
        assert_eq!(c.notification_ttl(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn builder_strips_leading_dot() {
        let c = WorkflowConfig::builder()
            .output_extension(".csv")
            .build()
            .unwrap();
        assert_eq!(c.output_extension, "csv");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = WorkflowConfig::builder()
            .service_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidConfig(_)));
    }

    #[test]
    fn zero_size_limit_is_rejected() {
        assert!(WorkflowConfig::builder()
            .max_file_size_bytes(0)
            .build()
            .is_err());
    }

    #[test]
    fn debug_hides_observer() {
        let s = format!("{:?}", WorkflowConfig::default());
        assert!(s.contains("max_file_size_bytes"));
        assert!(s.contains("observer: None"));
    }
}
