//! Error types for the pdf2sheet library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConversionError`] is **recoverable**: something went wrong inside the
//!   conversion workflow (wrong file type, service outage, expired session).
//!   The controller records it, notifies the user, and stays interactive.
//!
//! * [`WorkflowError`] is **fatal to setup**: the workflow could not be entered
//!   or configured at all (auth gate denied entry, unreadable input file,
//!   invalid configuration). Never produced by a workflow command.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Every failure a conversion job can end in.
///
/// The variants fall into three groups; see [`ConversionError::is_input_error`],
/// [`ConversionError::is_service_error`] and [`ConversionError::is_auth_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The candidate's declared media type is not PDF.
    #[error("Please upload a PDF file")]
    InvalidFileType,

    /// The candidate exceeds the configured size limit.
    #[error("File exceeds the maximum upload size")]
    FileTooLarge,

    // ── Service errors ────────────────────────────────────────────────────
    /// The conversion service could not be reached or refused the request.
    #[error("Conversion service is unavailable, please try again")]
    ServiceUnavailable,

    /// The conversion service did not answer in time.
    #[error("Conversion timed out, please try again")]
    ServiceTimeout,

    /// The conversion service answered with something that is not a spreadsheet.
    #[error("Conversion service returned an invalid result")]
    MalformedResult,

    // ── Auth errors ───────────────────────────────────────────────────────
    /// The session is missing or expired.
    #[error("Your session has expired, please log in again")]
    AuthExpired,
}

impl ConversionError {
    /// Detected synchronously by intake; never reaches the service.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::InvalidFileType | Self::FileTooLarge)
    }

    /// Reported by the conversion service; recoverable by converting again.
    pub fn is_service_error(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable | Self::ServiceTimeout | Self::MalformedResult
        )
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthExpired)
    }
}

/// Fatal errors raised while entering or configuring the workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    // ── Auth ──────────────────────────────────────────────────────────────
    /// The auth gate refused entry; the caller should be sent to `redirect`.
    #[error("Not authorized to use the converter, redirecting to '{redirect}'")]
    Unauthorized { redirect: String },

    // ── Input ─────────────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Config ────────────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
