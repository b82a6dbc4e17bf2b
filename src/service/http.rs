//! HTTP conversion service: POST the PDF, receive the spreadsheet.
//!
//! ## Wire contract
//!
//! ```text
//! POST {endpoint}/convert
//! Content-Type: application/pdf
//! X-Job-Id: <uuid>
//! Authorization: Bearer <token>        (optional)
//!
//! <pdf bytes>
//! ```
//!
//! A `2xx` answer must carry the spreadsheet itself. XLSX files are ZIP
//! containers, so the body is checked for the `PK\x03\x04` signature before
//! it is written to `output_dir/<job id>/<result filename>` (temp file +
//! rename). Each job owns its directory: a superseded or timed-out call that
//! finishes late never overwrites the spreadsheet of a newer job.
//!
//! ## Status mapping
//!
//! | Answer | Error |
//! |---|---|
//! | 401, 403 | `AuthExpired` |
//! | 408, 504, client timeout | `ServiceTimeout` |
//! | 422, 2xx without ZIP body | `MalformedResult` |
//! | connect failure, 429, 5xx, anything else | `ServiceUnavailable` |

use crate::error::{ConversionError, WorkflowError};
use crate::job::{DownloadHandle, ResultArtifact};
use crate::service::{ConversionRequest, ConversionService};
use futures::future::{BoxFuture, FutureExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Leading bytes of a ZIP container (and therefore of every XLSX file).
pub const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Connection settings for [`HttpConversionService`].
#[derive(Clone)]
pub struct HttpServiceConfig {
    /// Base URL of the converter, e.g. `https://convert.example.com/api`.
    pub endpoint: String,

    /// Sent as `Authorization: Bearer …` when set.
    pub bearer_token: Option<String>,

    /// Root directory for produced spreadsheets; each job writes into its
    /// own `<job id>` subdirectory. Default: current directory.
    pub output_dir: PathBuf,

    /// TCP connect timeout in seconds. Default: 10.
    ///
    /// The overall request deadline is enforced by the controller
    /// (`service_timeout_secs`), not here.
    pub connect_timeout_secs: u64,
}

impl HttpServiceConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bearer_token: None,
            output_dir: PathBuf::from("."),
            connect_timeout_secs: 10,
        }
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs.max(1);
        self
    }
}

impl std::fmt::Debug for HttpServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "<redacted>"))
            .field("output_dir", &self.output_dir)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

/// Conversion service backed by a remote HTTP converter.
pub struct HttpConversionService {
    client: reqwest::Client,
    convert_url: reqwest::Url,
    config: HttpServiceConfig,
}

impl HttpConversionService {
    pub fn new(config: HttpServiceConfig) -> Result<Self, WorkflowError> {
        let base = config.endpoint.trim_end_matches('/');
        let convert_url = reqwest::Url::parse(&format!("{base}/convert")).map_err(|e| {
            WorkflowError::InvalidConfig(format!("Invalid endpoint '{}': {e}", config.endpoint))
        })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| WorkflowError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            convert_url,
            config,
        })
    }

    pub fn convert_url(&self) -> &reqwest::Url {
        &self.convert_url
    }

    async fn convert_inner(
        &self,
        request: ConversionRequest,
    ) -> Result<ResultArtifact, ConversionError> {
        let job_id = request.job_id;
        let filename = request.result_filename();
        info!(
            "Job {}: uploading '{}' ({} bytes) to {}",
            job_id,
            request.document.name(),
            request.document.size_bytes(),
            self.convert_url
        );

        let mut builder = self
            .client
            .post(self.convert_url.clone())
            .header(CONTENT_TYPE, request.document.media_type())
            .header("X-Job-Id", job_id.to_string())
            .body(request.document.content());
        if let Some(ref token) = self.config.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Job {}: request failed: {}", job_id, e);
            classify_transport(&e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Job {}: converter answered HTTP {}", job_id, status);
            return Err(classify_status(status));
        }

        let body = response.bytes().await.map_err(|e| {
            warn!("Job {}: reading body failed: {}", job_id, e);
            classify_transport(&e)
        })?;

        if !looks_like_spreadsheet(&body) {
            warn!(
                "Job {}: converter returned {} bytes that are not a spreadsheet",
                job_id,
                body.len()
            );
            return Err(ConversionError::MalformedResult);
        }

        let job_dir = self.config.output_dir.join(job_id.to_string());
        let path = store_artifact(&job_dir, &filename, &body)
            .await
            .map_err(|e| {
                warn!("Job {}: could not store result: {}", job_id, e);
                ConversionError::MalformedResult
            })?;

        debug!("Job {}: stored {}", job_id, path.display());
        Ok(ResultArtifact::new(filename, DownloadHandle::File(path)))
    }
}

impl ConversionService for HttpConversionService {
    fn convert(
        &self,
        request: ConversionRequest,
    ) -> BoxFuture<'_, Result<ResultArtifact, ConversionError>> {
        self.convert_inner(request).boxed()
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Map a non-success HTTP status to a workflow error.
pub fn classify_status(status: StatusCode) -> ConversionError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ConversionError::AuthExpired,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            ConversionError::ServiceTimeout
        }
        StatusCode::UNPROCESSABLE_ENTITY => ConversionError::MalformedResult,
        _ => ConversionError::ServiceUnavailable,
    }
}

fn classify_transport(e: &reqwest::Error) -> ConversionError {
    if e.is_timeout() {
        ConversionError::ServiceTimeout
    } else if e.is_decode() {
        ConversionError::MalformedResult
    } else {
        ConversionError::ServiceUnavailable
    }
}

/// Whether `body` starts like an XLSX (ZIP) file.
pub fn looks_like_spreadsheet(body: &[u8]) -> bool {
    body.starts_with(ZIP_MAGIC)
}

/// Write `bytes` to `dir/filename` atomically: temp file, then rename.
async fn store_artifact(dir: &Path, filename: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
    // Only the final component: a document name must not escape `dir`.
    let safe_name = Path::new(filename)
        .file_name()
        .map(|n| n.to_os_string())
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("unusable file name '{filename}'"),
            )
        })?;

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(&safe_name);
    let tmp_path = dir.join(format!(".{}.part", safe_name.to_string_lossy()));

    tokio::fs::write(&tmp_path, bytes).await?;
    tokio::fs::rename(&tmp_path, &path).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), ConversionError::AuthExpired);
        assert_eq!(classify_status(StatusCode::FORBIDDEN), ConversionError::AuthExpired);
        assert_eq!(
            classify_status(StatusCode::GATEWAY_TIMEOUT),
            ConversionError::ServiceTimeout
        );
        assert_eq!(
            classify_status(StatusCode::REQUEST_TIMEOUT),
            ConversionError::ServiceTimeout
        );
        assert_eq!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY),
            ConversionError::MalformedResult
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            ConversionError::ServiceUnavailable
        );
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            ConversionError::ServiceUnavailable
        );
    }

    #[test]
    fn spreadsheet_signature() {
        assert!(looks_like_spreadsheet(b"PK\x03\x04rest"));
        assert!(!looks_like_spreadsheet(b"{\"ok\":true}"));
        assert!(!looks_like_spreadsheet(b""));
    }

    #[test]
    fn invalid_endpoint_rejected() {
        let err = HttpConversionService::new(HttpServiceConfig::new("not a url")).err();
        assert!(matches!(err, Some(WorkflowError::InvalidConfig(_))));
    }

    #[test]
    fn convert_url_appends_path() {
        let svc =
            HttpConversionService::new(HttpServiceConfig::new("http://localhost:9000/api/"))
                .unwrap();
        assert_eq!(svc.convert_url().as_str(), "http://localhost:9000/api/convert");
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = HttpServiceConfig::new("http://x").bearer_token("secret");
        let s = format!("{cfg:?}");
        assert!(!s.contains("secret"));
    }

    #[tokio::test]
    async fn store_artifact_stays_inside_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = store_artifact(dir.path(), "../escape.xlsx", b"PK\x03\x04")
            .await
            .unwrap();
        assert_eq!(path, dir.path().join("escape.xlsx"));
        assert_eq!(std::fs::read(&path).unwrap(), b"PK\x03\x04");
    }
}
