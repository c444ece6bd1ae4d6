//! CLI binary for edgequake-digest.
//!
//! A thin shim over the library crate: maps flags onto `DigestConfig`,
//! runs one digest, and prints the report.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_digest::{
    DigestConfig, DigestProgressCallback, DigestReport, Degradation, Digester, DocumentWriter,
    ProgressCallback, Stage, Upload,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner plus one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
    degraded: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(Stage::ALL.len() as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:24.green/238}] {pos}/{len}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_prefix("Digest");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            degraded: AtomicUsize::new(0),
        })
    }
}

impl DigestProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage.activity()));
    }

    fn on_stage_complete(&self, stage: Stage) {
        self.bar
            .println(format!("  {} {}", green("✓"), stage.activity()));
        self.bar.inc(1);
    }

    fn on_stage_degraded(&self, stage: Stage, reason: &Degradation) {
        self.degraded.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {}  {}",
            yellow("⚠"),
            stage.activity(),
            dim(&reason.to_string())
        ));
    }

    fn on_digest_complete(&self, degraded_stages: usize) {
        self.bar.finish_and_clear();
        if degraded_stages == 0 {
            eprintln!("{} digest complete", green("✔"));
        } else {
            eprintln!(
                "{} digest complete with {} fallback(s)",
                yellow("⚠"),
                bold(&degraded_stages.to_string())
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a paper, save .md/.docx under ./docs and an image under ./static/images
  pdfdigest run paper.pdf

  # Keep all output under another directory, print the report as JSON
  pdfdigest run --root /tmp/digest --json paper.pdf

  # Copy a saved document somewhere else
  pdfdigest fetch paper_20240101_120000.docx -o ~/Desktop/paper.docx

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY      Summary backend key (mock summary when unset)
  ANTHROPIC_API_KEY   Visualization-prompt backend key (default prompt when unset)
  GEMINI_API_KEY      Image backend key (placeholder image when unset)
  PDFIUM_LIB_PATH     Path to an existing libpdfium (skips auto-download)
  RUST_LOG            Log filter, overrides --verbose/--quiet

A `.env` file in the working directory is loaded first.
"#;

/// Summarise research-paper PDFs into sections, documents and an image.
#[derive(Parser, Debug)]
#[command(
    name = "pdfdigest",
    version,
    about = "Summarise research-paper PDFs into sections, documents and an image",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Directory holding uploads/, docs/ and static/images/.
    #[arg(long, global = true, env = "PDFDIGEST_ROOT", default_value = ".")]
    root: PathBuf,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFDIGEST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFDIGEST_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Digest one PDF.
    Run(RunArgs),
    /// Retrieve a saved summary document by name.
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// The PDF to digest.
    pdf: PathBuf,

    /// Print the report as JSON.
    #[arg(long, env = "PDFDIGEST_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PDFDIGEST_NO_PROGRESS")]
    no_progress: bool,

    /// Summary model.
    #[arg(long, env = "PDFDIGEST_SUMMARY_MODEL")]
    summary_model: Option<String>,

    /// Summary sampling temperature (0.0–2.0).
    #[arg(long, env = "PDFDIGEST_SUMMARY_TEMPERATURE")]
    summary_temperature: Option<f32>,

    /// Visualization-prompt model.
    #[arg(long, env = "PDFDIGEST_PROMPT_MODEL")]
    prompt_model: Option<String>,

    /// Max tokens for the visualization prompt.
    #[arg(long, env = "PDFDIGEST_PROMPT_MAX_TOKENS")]
    prompt_max_tokens: Option<usize>,

    /// Image model.
    #[arg(long, env = "PDFDIGEST_IMAGE_MODEL")]
    image_model: Option<String>,
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// Document file name as shown in the report.
    name: String,

    /// Copy the document here instead of writing it to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless --verbose asks for them.
    let show_progress = match &cli.command {
        Command::Run(args) => !cli.quiet && !args.no_progress && !args.json,
        Command::Fetch(_) => false,
    };
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

    match cli.command {
        Command::Run(ref args) => run(&cli, args, show_progress).await,
        Command::Fetch(ref args) => fetch(&cli, args).await,
    }
}

async fn run(cli: &Cli, args: &RunArgs, show_progress: bool) -> Result<()> {
    // PDFium is downloaded on first use; do it up front so the spinner
    // does not sit on "Extracting text" for the whole download.
    if !pdfium_auto::is_pdfium_cached() {
        if !cli.quiet {
            eprintln!("{} Downloading PDF engine (first run only)…", cyan("◆"));
        }
        tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .context("Failed to download PDFium engine")?;
    }

    let config = build_config(cli, args)?;
    let mut digester = Digester::new(config).context("Failed to prepare working directories")?;
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        digester = digester.with_progress(cb);
    }

    let upload = Upload::from_path(&args.pdf);
    let report = match digester.process(&upload).await {
        Ok(report) => report,
        Err(e) if e.is_retry_upload() => {
            anyhow::bail!("{e}\nPlease provide a readable .pdf file and try again.")
        }
        Err(e) => return Err(e).context("Digest failed"),
    };

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        print_report(&report).context("Failed to write to stdout")?;
    }
    Ok(())
}

fn build_config(cli: &Cli, args: &RunArgs) -> Result<DigestConfig> {
    let mut builder = DigestConfig::builder()
        .root_dir(&cli.root)
        .credentials_from_env();
    if let Some(ref m) = args.summary_model {
        builder = builder.summary_model(m);
    }
    if let Some(t) = args.summary_temperature {
        builder = builder.summary_temperature(t);
    }
    if let Some(ref m) = args.prompt_model {
        builder = builder.prompt_model(m);
    }
    if let Some(n) = args.prompt_max_tokens {
        builder = builder.prompt_max_tokens(n);
    }
    if let Some(ref m) = args.image_model {
        builder = builder.image_model(m);
    }
    builder.build().context("Invalid configuration")
}

fn print_report(report: &DigestReport) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "{}", bold(&format!("# {}", report.original_filename)))?;
    writeln!(out)?;
    if report.raw_summary.is_none() {
        writeln!(out, "{}", report.display_summary())?;
    }
    for (section, content) in report.summary.iter() {
        writeln!(out, "{}", bold(&format!("## {section}")))?;
        writeln!(out, "{content}")?;
        writeln!(out)?;
    }

    writeln!(out, "{}", bold("## Visualization prompt"))?;
    writeln!(out, "{}", report.display_prompt())?;
    writeln!(out)?;

    writeln!(
        out,
        "Image:     {}",
        report.image_path().unwrap_or("(none)")
    )?;
    writeln!(
        out,
        "Markdown:  {}",
        report.markdown_file_name().unwrap_or("(not saved)")
    )?;
    writeln!(
        out,
        "DOCX:      {}",
        report.docx_file_name().unwrap_or("(not saved)")
    )?;
    for note in &report.degraded {
        writeln!(
            out,
            "{}",
            dim(&format!("fallback in {}: {}", note.stage, note.reason))
        )?;
    }
    writeln!(out, "{}", dim(&format!("{}ms", report.duration_ms)))?;
    Ok(())
}

async fn fetch(cli: &Cli, args: &FetchArgs) -> Result<()> {
    let config = DigestConfig::builder()
        .root_dir(&cli.root)
        .build()
        .context("Invalid configuration")?;
    let writer = DocumentWriter::new(&config.docs_dir, config.section_labels.clone());
    let path = writer
        .resolve_download(&args.name)
        .with_context(|| format!("Cannot fetch '{}'", args.name))?;

    match args.output {
        Some(ref dest) => {
            tokio::fs::copy(&path, dest)
                .await
                .with_context(|| format!("Failed to copy to {}", dest.display()))?;
            if !cli.quiet {
                eprintln!("{} {}", green("✔"), bold(&dest.display().to_string()));
            }
        }
        None => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            io::stdout()
                .lock()
                .write_all(&bytes)
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
