//! # pdf2sheet
//!
//! Client-side workflow for turning an uploaded PDF into a spreadsheet.
//!
//! The crate owns everything between "a user picked a file" and "here is
//! your download": validating the upload, tracking one conversion job
//! through its lifecycle, talking to an asynchronous conversion service,
//! surfacing one notification at a time, and refusing work once the
//! session has expired. The byte-level PDF → XLSX transformation itself
//! lives behind the [`ConversionService`] trait.
//!
//! ## Workflow Overview
//!
//! ```text
//! FileCandidate
//!  │
//!  ├─ 1. Auth     AuthGate checked on entry and before every convert
//!  ├─ 2. Intake   media type + 10 MB limit → Document
//!  ├─ 3. Submit   new ConversionJob (fresh JobId), request dispatched
//!  ├─ 4. Service  runs on its own task, bounded by service_timeout
//!  ├─ 5. Reply    applied only if its JobId is still the active job
//!  └─ 6. Result   ResultArtifact (report.pdf → report.xlsx) or error
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2sheet::{
//!     AllowAll, ConversionController, FileCandidate, SimulatedConversionService,
//!     WorkflowConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut controller = ConversionController::enter(
//!         WorkflowConfig::default(),
//!         Arc::new(SimulatedConversionService::default()),
//!         Arc::new(AllowAll),
//!     )?;
//!
//!     let file = FileCandidate::from_path("report.pdf").await?;
//!     controller.select_file(file)?;
//!     controller.convert()?;
//!
//!     let status = controller.wait_until_settled().await;
//!     println!("{status}: {:?}", controller.result());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2sheet` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2sheet = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod auth;
pub mod config;
pub mod controller;
pub mod error;
pub mod intake;
pub mod job;
pub mod notify;
pub mod observer;
pub mod service;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use auth::{AllowAll, AuthGate, SessionAuthGate};
pub use config::{WorkflowConfig, WorkflowConfigBuilder};
pub use controller::{ConversionController, ConvertAck, ReplyDisposition, WorkflowSnapshot};
pub use error::{ConversionError, WorkflowError};
pub use intake::{format_file_size, result_filename, Document, DocumentSummary, FileCandidate};
pub use job::{ConversionJob, DownloadHandle, JobId, JobStatus, ResultArtifact};
pub use notify::{Notification, NotificationChannel, NotificationKind};
pub use observer::{NoopObserver, WorkflowObserver};
pub use service::http::{HttpConversionService, HttpServiceConfig};
pub use service::simulated::SimulatedConversionService;
pub use service::{ConversionReply, ConversionRequest, ConversionService};
