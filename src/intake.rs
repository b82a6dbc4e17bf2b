//! Document intake: turn a raw file candidate into a validated [`Document`].
//!
//! Validation is synchronous and side-effect free. The controller publishes
//! the rejection notification; this module only decides.
//!
//! ## Check order
//!
//! 1. Declared media type must match the accepted type (`application/pdf`).
//! 2. Size must not exceed the configured limit.
//! 3. *(optional)* Content must start with the `%PDF` signature.
//!
//! A candidate violating several rules reports the first failing check.

use crate::config::{WorkflowConfig, PDF_MEDIA_TYPE};
use crate::error::{ConversionError, WorkflowError};
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Leading bytes of every PDF file.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

const OCTET_STREAM: &str = "application/octet-stream";

static PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// A file as handed over by the user, before any validation.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub size_bytes: u64,
    /// Media type as declared by the source (browser, OS, sniffing).
    pub media_type: String,
    pub content: Bytes,
}

impl FileCandidate {
    /// Build a candidate whose size is the length of `content`.
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            size_bytes: content.len() as u64,
            media_type: media_type.into(),
            content,
        }
    }

    /// Override the size, for descriptors that declare it separately from
    /// the bytes actually loaded.
    pub fn with_declared_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    /// Read a local file into a candidate.
    ///
    /// The media type is sniffed from the content: files starting with
    /// `%PDF` are declared `application/pdf`, everything else
    /// `application/octet-stream`.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref().to_path_buf();

        let content = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => WorkflowError::FileNotFound { path: path.clone() },
            std::io::ErrorKind::PermissionDenied => {
                WorkflowError::PermissionDenied { path: path.clone() }
            }
            _ => WorkflowError::Internal(format!("Failed to read '{}': {}", path.display(), e)),
        })?;

        let name = file_name_of(&path);
        let media_type = sniff_media_type(&content);
        debug!(
            "Read candidate '{}' ({} bytes, {})",
            name,
            content.len(),
            media_type
        );

        Ok(Self::new(name, media_type, content))
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// A validated source document. Immutable once created.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    size_bytes: u64,
    media_type: String,
    content: Bytes,
}

impl Document {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Cheap handle to the raw bytes.
    pub fn content(&self) -> Bytes {
        self.content.clone()
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            name: self.name.clone(),
            size_bytes: self.size_bytes,
            size_display: format_file_size(self.size_bytes),
        }
    }
}

/// What the presentation layer shows about the selected document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub name: String,
    pub size_bytes: u64,
    pub size_display: String,
}

/// Validate a candidate against the workflow configuration.
pub fn validate(
    candidate: FileCandidate,
    config: &WorkflowConfig,
) -> Result<Document, ConversionError> {
    if !media_type_matches(&candidate.media_type, &config.accepted_media_type) {
        debug!(
            "Rejected '{}': media type '{}'",
            candidate.name, candidate.media_type
        );
        return Err(ConversionError::InvalidFileType);
    }

    if candidate.size_bytes > config.max_file_size_bytes {
        debug!(
            "Rejected '{}': {} bytes exceeds {}",
            candidate.name, candidate.size_bytes, config.max_file_size_bytes
        );
        return Err(ConversionError::FileTooLarge);
    }

    if config.require_pdf_signature && !candidate.content.starts_with(PDF_MAGIC) {
        debug!("Rejected '{}': missing %PDF signature", candidate.name);
        return Err(ConversionError::InvalidFileType);
    }

    Ok(Document {
        name: candidate.name,
        size_bytes: candidate.size_bytes,
        media_type: candidate.media_type,
        content: candidate.content,
    })
}

/// Compare media types case-insensitively, ignoring parameters such as
/// `; charset=binary`.
pub fn media_type_matches(declared: &str, accepted: &str) -> bool {
    let essence = declared.split(';').next().unwrap_or("").trim();
    essence.eq_ignore_ascii_case(accepted.trim())
}

/// Guess a media type from the first bytes of a file.
pub fn sniff_media_type(content: &[u8]) -> &'static str {
    if content.starts_with(PDF_MAGIC) {
        PDF_MEDIA_TYPE
    } else {
        OCTET_STREAM
    }
}

/// Name of the spreadsheet produced from a document called `document_name`.
///
/// A trailing `.pdf` (any case) is replaced by `.{extension}`; other names
/// simply get the extension appended.
pub fn result_filename(document_name: &str, extension: &str) -> String {
    let base = PDF_SUFFIX.replace(document_name, "");
    format!("{}.{}", base, extension.trim_start_matches('.'))
}

/// Human-readable size in binary units: `0 Bytes`, `1.5 KB`, `1.91 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
