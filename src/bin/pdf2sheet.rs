//! CLI binary for pdf2sheet.
//!
//! A thin shim over the library crate: reads a PDF from disk, runs it through
//! the conversion workflow and prints where the spreadsheet ended up.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2sheet::{
    AllowAll, AuthGate, ConversionController, ConversionError, ConversionService, DownloadHandle,
    FileCandidate, HttpConversionService, HttpServiceConfig, JobId, JobStatus, Notification,
    NotificationKind, SessionAuthGate, SimulatedConversionService, WorkflowConfig, WorkflowError,
    WorkflowObserver,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Spinner driven by workflow events ────────────────────────────────────────

struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        Arc::new(Self { bar })
    }
}

impl WorkflowObserver for CliObserver {
    fn on_status_change(&self, _job: Option<JobId>, _from: JobStatus, to: JobStatus) {
        match to {
            JobStatus::InProgress => {
                self.bar.set_prefix("Converting");
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            JobStatus::Completed | JobStatus::Failed => self.bar.finish_and_clear(),
            _ => {}
        }
    }

    fn on_request_dispatched(&self, job: JobId) {
        self.bar.set_message(dim(&format!("job {job}")));
    }

    fn on_notification(&self, notification: &Notification) {
        let mark = match notification.kind {
            NotificationKind::Success => green("✔"),
            NotificationKind::Error => red("✘"),
            NotificationKind::Info => dim("ℹ"),
        };
        self.bar.println(format!("{mark} {}", notification.text));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Try the workflow without a backend (2s simulated conversion)
  pdf2sheet report.pdf

  # Convert with a remote converter, spreadsheet written to ./out
  pdf2sheet --endpoint https://convert.example.com/api --token $TOKEN \
            --output-dir out report.pdf

  # Machine-readable result
  pdf2sheet --json report.pdf

ENVIRONMENT VARIABLES:
  PDF2SHEET_ENDPOINT      Base URL of the conversion service
  PDF2SHEET_TOKEN         Bearer token for the conversion service
  PDF2SHEET_OUTPUT_DIR    Where produced spreadsheets are written
  RUST_LOG                Log filter, overrides --verbose/--quiet
"#;

/// Convert a PDF into a spreadsheet through a conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2sheet",
    version,
    about = "Convert PDF files to spreadsheets",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file to convert.
    input: PathBuf,

    /// Conversion service base URL. Without it the simulated service is used.
    #[arg(long, env = "PDF2SHEET_ENDPOINT")]
    endpoint: Option<String>,

    /// Bearer token for the conversion service.
    #[arg(long, env = "PDF2SHEET_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Root directory for spreadsheets; each job writes into `<dir>/<job id>/`.
    #[arg(long, env = "PDF2SHEET_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Maximum accepted file size in bytes.
    #[arg(long, env = "PDF2SHEET_MAX_SIZE", default_value_t = pdf2sheet::config::DEFAULT_MAX_FILE_SIZE_BYTES)]
    max_size: u64,

    /// Conversion timeout in seconds.
    #[arg(long, env = "PDF2SHEET_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Delay of the simulated service in milliseconds.
    #[arg(long, env = "PDF2SHEET_SIMULATE_DELAY_MS", default_value_t = 2000)]
    simulate_delay_ms: u64,

    /// Print the final workflow snapshot as JSON.
    #[arg(long, env = "PDF2SHEET_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "PDF2SHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2SHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2SHEET_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Wire the workflow ────────────────────────────────────────────────
    let mut builder = WorkflowConfig::builder()
        .max_file_size_bytes(cli.max_size)
        .service_timeout_secs(cli.timeout);
    if show_progress {
        builder = builder.observer(CliObserver::new() as Arc<dyn WorkflowObserver>);
    }
    let config = builder.build().context("Invalid configuration")?;

    let (service, auth) = build_service(&cli)?;

    let mut controller = match ConversionController::enter(config, service, auth) {
        Ok(c) => c,
        Err(WorkflowError::Unauthorized { redirect }) => {
            eprintln!("{} not signed in, continue at {}", red("✘"), bold(&redirect));
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e).context("Failed to start workflow"),
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let candidate = FileCandidate::from_path(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;

    let outcome = submit(&mut controller, candidate).await;
    let snapshot = controller.snapshot();

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("Failed to serialise snapshot")?
        );
    } else if !cli.quiet {
        match (&snapshot.result, outcome) {
            (Some(artifact), Ok(JobStatus::Completed)) => {
                let location = match &artifact.download_handle {
                    DownloadHandle::File(path) => path.display().to_string(),
                    DownloadHandle::Url(url) => url.clone(),
                };
                eprintln!(
                    "{}  {}  →  {}",
                    green("✔"),
                    bold(&artifact.filename),
                    dim(&location)
                );
            }
            (_, Err(e)) if !show_progress => eprintln!("{} {}", red("✘"), e),
            (_, Ok(status)) if status != JobStatus::Completed => {
                eprintln!("{} conversion ended as {}", red("✘"), status)
            }
            _ => {}
        }
    }

    Ok(match snapshot.status {
        JobStatus::Completed => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Select, convert, and wait for the single job to settle.
///
/// Returns the settled status, or the error the workflow reported.
async fn submit(
    controller: &mut ConversionController,
    candidate: FileCandidate,
) -> Result<JobStatus, ConversionError> {
    controller.select_file(candidate)?;
    controller.convert()?;
    let status = controller.wait_until_settled().await;
    match (status, controller.error()) {
        (JobStatus::Failed, Some(error)) => Err(error),
        _ => Ok(status),
    }
}

/// Pick the HTTP service when an endpoint is configured, else the simulation.
fn build_service(cli: &Cli) -> Result<(Arc<dyn ConversionService>, Arc<dyn AuthGate>)> {
    let Some(ref endpoint) = cli.endpoint else {
        let service =
            SimulatedConversionService::new(Duration::from_millis(cli.simulate_delay_ms));
        return Ok((Arc::new(service), Arc::new(AllowAll)));
    };

    let mut http = HttpServiceConfig::new(endpoint.clone()).output_dir(cli.output_dir.clone());
    let gate = SessionAuthGate::new();
    if let Some(ref token) = cli.token {
        http = http.bearer_token(token.clone());
        gate.login(token.clone(), None);
    }

    let service = HttpConversionService::new(http).context("Invalid conversion service")?;
    Ok((Arc::new(service), Arc::new(gate)))
}
