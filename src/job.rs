//! Conversion job data model.
//!
//! A [`ConversionJob`] is one attempt to turn a [`Document`] into a
//! [`ResultArtifact`]. Jobs are owned and mutated exclusively by the
//! [`crate::controller::ConversionController`]; everything here is plain data.

use crate::error::ConversionError;
use crate::intake::Document;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Opaque, unique identifier of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the workflow currently stands.
///
/// ```text
/// Idle ─▶ FileSelected ─▶ Submitted ─▶ InProgress ─▶ Completed | Failed
/// ```
///
/// `Completed` and `Failed` fall back to `FileSelected`/`Idle` on the next
/// selection or removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Idle,
    FileSelected,
    Submitted,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    /// A job in this status is eligible to have its reply accepted.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Submitted | Self::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::FileSelected => "file selected",
            Self::Submitted => "submitted",
            Self::InProgress => "in progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Reference to the bytes of a produced spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "location", rename_all = "snake_case")]
pub enum DownloadHandle {
    /// Stored on the local file system.
    File(PathBuf),
    /// Served by the conversion backend.
    Url(String),
}

impl fmt::Display for DownloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u),
        }
    }
}

/// Downloadable output of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultArtifact {
    pub filename: String,
    pub download_handle: DownloadHandle,
    pub produced_at: DateTime<Utc>,
}

impl ResultArtifact {
    pub fn new(filename: impl Into<String>, download_handle: DownloadHandle) -> Self {
        Self {
            filename: filename.into(),
            download_handle,
            produced_at: Utc::now(),
        }
    }
}

/// One attempt to convert a document.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    id: JobId,
    source_document: Document,
    pub(crate) status: JobStatus,
    pub(crate) result: Option<ResultArtifact>,
    pub(crate) error: Option<ConversionError>,
    created_at: DateTime<Utc>,
}

impl ConversionJob {
    /// Allocate a fresh job in the `Submitted` state.
    pub(crate) fn submit(source_document: Document) -> Self {
        Self {
            id: JobId::new(),
            source_document,
            status: JobStatus::Submitted,
            result: None,
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source_document(&self) -> &Document {
        &self.source_document
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn result(&self) -> Option<&ResultArtifact> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<ConversionError> {
        self.error
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_unique() {
        assert_ne!(JobId::new(), JobId::new());
    }

    #[test]
    fn active_and_terminal_statuses() {
        assert!(JobStatus::Submitted.is_active());
        assert!(JobStatus::InProgress.is_active());
        assert!(!JobStatus::FileSelected.is_active());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Idle.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&JobStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn download_handle_serializes_tagged() {
        let h = DownloadHandle::Url("https://example.com/r.xlsx".into());
        let v = serde_json::to_value(&h).unwrap();
        assert_eq!(v["kind"], "url");
        assert_eq!(v["location"], "https://example.com/r.xlsx");
    }
}
