//! CLI binary for pdf2text.
//!
//! A thin shim over the library crate that maps CLI flags to `OcrConfig`,
//! submits one document, and prints or saves the extracted text.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2text::{
    Document, OcrConfig, OcrError, OcrProcessor, ProcessingProgress, ProgressCallback,
    RetryPolicy, SearchConfig, SearchSession, Status, TextStats,
};
use std::io::{self, Write};
use std::path::PathBuf;
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner that tracks the pipeline's status
/// and logs retry waits as they are scheduled.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Submitting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProcessingProgress for CliProgress {
    fn on_status_change(&self, status: Status) {
        match status {
            Status::Uploading => self.bar.set_message("uploading…"),
            Status::Processing => {
                self.bar.set_prefix("Processing");
                self.bar.set_message("waiting for the OCR service…");
            }
            Status::Error => self.bar.set_message("attempt failed"),
            _ => {}
        }
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_message(format!("{percent}%"));
    }

    fn on_retry_scheduled(&self, attempt: u32, delay: Duration) {
        self.bar.println(format!(
            "  {} attempt failed — retry {} in {:.0?}",
            cyan("↻"),
            attempt,
            delay
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic extraction (stdout)
  pdf2text scan.pdf --url https://ocr.example.com/webhook/abc

  # Save to a file
  pdf2text scan.pdf -o scan.txt

  # Search the extracted text
  pdf2text scan.pdf --find "invoice number"

  # Text statistics alongside the result
  pdf2text scan.pdf --stats

  # Structured JSON (text + stats + matches)
  pdf2text scan.pdf --find total --json > result.json

  # A patient schedule for a slow OCR backend
  pdf2text scan.pdf --max-attempts 5 --retry-delays 0,5000,15000,60000,120000

ENVIRONMENT VARIABLES:
  PDF2TEXT_WEBHOOK_URL   OCR webhook endpoint (alternative to --url)
  PDF2TEXT_OUTPUT        Default output path (alternative to -o)

EXIT STATUS:
  0  extraction succeeded
  1  validation failed, retries exhausted, or the request was rejected
"#;

/// Extract text from PDF documents via a remote OCR webhook.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2text",
    version,
    about = "Extract text from PDF documents via a remote OCR webhook",
    long_about = "Send a PDF to a remote OCR webhook, govern the attempt lifecycle with a bounded \
retry schedule, and print, save, or search the extracted text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// OCR webhook endpoint URL.
    #[arg(long, env = "PDF2TEXT_WEBHOOK_URL")]
    url: String,

    /// Write extracted text to this file instead of stdout.
    #[arg(short, long, env = "PDF2TEXT_OUTPUT")]
    output: Option<PathBuf>,

    /// Search the extracted text for this literal query.
    #[arg(long)]
    find: Option<String>,

    /// Print text statistics (lines, words, reading time).
    #[arg(long)]
    stats: bool,

    /// Output structured JSON (text, stats, matches) instead of plain text.
    #[arg(long)]
    json: bool,

    /// Hard per-attempt timeout in seconds.
    #[arg(long, default_value_t = 600)]
    timeout: u64,

    /// Total attempts, including the first.
    #[arg(long, default_value_t = 4)]
    max_attempts: u32,

    /// Retry delay schedule in milliseconds, comma-separated. The first
    /// entry must be 0 and the rest strictly increasing.
    #[arg(long, default_value = "0,2000,8000,30000")]
    retry_delays: String,

    /// Maximum accepted file size in bytes.
    #[arg(long, default_value_t = 100 * 1024 * 1024)]
    max_file_size: u64,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides all the feedback that matters to the user.
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress = if show_progress {
        Some(CliProgress::new())
    } else {
        None
    };

    let config = build_config(&cli, progress.clone().map(|p| p as ProgressCallback))?;
    let processor = OcrProcessor::new(config).context("Failed to initialise the processor")?;

    // ── Load and submit ──────────────────────────────────────────────────
    let doc = Document::from_path(&cli.input)
        .await
        .with_context(|| format!("Failed to load {}", cli.input.display()))?;
    let name = doc.name().to_string();

    let result = processor.submit(doc).await;
    if let Some(ref p) = progress {
        p.finish();
    }

    let text = match result {
        Ok(text) => text,
        Err(err) => {
            report_failure(&err);
            std::process::exit(1);
        }
    };

    if !cli.quiet {
        eprintln!(
            "{} {} — {} of text extracted",
            green("✔"),
            bold(&name),
            pdf2text::format_file_size(text.len() as u64),
        );
    }

    // ── Search and stats over the result ─────────────────────────────────
    let stats = cli.stats.then(|| TextStats::of(&text));
    let search = cli.find.as_deref().map(|query| {
        let mut session = SearchSession::new(text.as_str(), SearchConfig::default());
        session.search_now(query);
        session.state()
    });

    // ── Emit ─────────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::json!({
            "file": name,
            "text": text,
            "stats": stats,
            "matches": search.as_ref().map(|s| &s.results),
            "truncated": search.as_ref().map(|s| s.truncated),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if let Some(ref output_path) = cli.output {
        tokio::fs::write(output_path, &text)
            .await
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        if !cli.quiet {
            eprintln!("   saved to {}", bold(&output_path.display().to_string()));
        }
    } else if cli.find.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if let Some(state) = search {
        print_matches(cli.find.as_deref().unwrap_or(""), &state);
    }

    if let Some(stats) = stats {
        print_stats(&stats);
    }

    Ok(())
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<OcrConfig> {
    let delays = parse_delays(&cli.retry_delays)?;
    let retry = RetryPolicy {
        max_attempts: cli.max_attempts,
        delays,
        ..RetryPolicy::default()
    };

    let mut builder = OcrConfig::builder()
        .webhook_url(&cli.url)
        .max_file_size(cli.max_file_size)
        .request_timeout(Duration::from_secs(cli.timeout))
        .retry(retry);

    if let Some(cb) = progress {
        builder = builder.progress(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--retry-delays` into a schedule.
fn parse_delays(s: &str) -> Result<Vec<Duration>> {
    s.split(',')
        .map(|part| {
            let ms: u64 = part
                .trim()
                .parse()
                .with_context(|| format!("Invalid delay '{}' (milliseconds)", part.trim()))?;
            Ok(Duration::from_millis(ms))
        })
        .collect()
}

fn report_failure(err: &OcrError) {
    eprintln!("{} {}", red("✘"), bold(&err.user_message()));
    for suggestion in err.suggestions() {
        eprintln!("   {} {}", dim("•"), suggestion);
    }
}

fn print_matches(query: &str, state: &pdf2text::SearchState) {
    if state.results.is_empty() {
        println!("no matches for {query:?}");
        return;
    }
    println!(
        "{} match(es) for {query:?}{}",
        bold(&state.results.len().to_string()),
        if state.truncated {
            " (truncated)"
        } else {
            ""
        }
    );
    for (i, result) in state.results.iter().enumerate() {
        let preview = result.preview.replace(['\n', '\r'], " ");
        println!(
            "  {:>4}. {} {}",
            i + 1,
            dim(&format!("@{}", result.index)),
            preview
        );
    }
}

fn print_stats(stats: &TextStats) {
    println!("{}", bold("Text statistics"));
    println!("  lines:        {}", stats.lines);
    println!("  words:        {}", stats.words);
    println!("  characters:   {}", stats.characters);
    println!("  non-space:    {}", stats.characters_no_whitespace);
    println!("  reading time: {} min", stats.reading_time_minutes);
}
