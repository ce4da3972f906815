//! # pdf2text
//!
//! Send PDF documents to a remote OCR webhook and search the extracted text.
//!
//! ## Why this crate?
//!
//! OCR services behind simple webhooks are easy to call once and hard to call
//! well: large scans take minutes, transient 5xx and timeouts are routine
//! under load, and a naive client either gives up too early or hammers a
//! recovering backend. This crate owns the whole submission lifecycle —
//! validation, one in-flight request, a bounded schedule-driven retry loop,
//! cooperative cancellation — behind a single observable state, and pairs it
//! with a debounced search engine for working with the extracted text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Validate  content type, size cap, non-empty — before any network
//!  ├─ 2. Submit    multipart POST to the webhook (10-minute hard timeout)
//!  ├─ 3. Retry     up to 4 attempts; waits of 2 s → 8 s → 30 s between them
//!  └─ 4. Result    trimmed text + search/stats over it
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2text::{Document, OcrConfig, OcrProcessor, SearchConfig, SearchSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = OcrConfig::builder()
//!         .webhook_url("https://ocr.example.com/webhook/abc")
//!         .build()?;
//!     let processor = OcrProcessor::new(config)?;
//!
//!     let doc = Document::from_path("scan.pdf").await?;
//!     let text = processor.submit(doc).await?;
//!
//!     let mut search = SearchSession::new(text.as_str(), SearchConfig::default());
//!     search.search_now("invoice");
//!     println!("{} match(es)", search.state().results.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2text` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2text = { version = "0.4", default-features = false }
//! ```
//!
//! ## Observing progress
//!
//! Poll [`OcrProcessor::state`], await [`OcrProcessor::subscribe`], or inject
//! a [`ProcessingProgress`] callback via the config builder — whichever fits
//! the host. Cancellation ([`OcrProcessor::cancel`]) resets to idle
//! synchronously and clears any pending retry timer.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod search;
pub mod stats;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OcrConfig, OcrConfigBuilder, RetryPolicy, SearchConfig};
pub use document::Document;
pub use error::{format_file_size, ErrorKind, OcrError};
pub use pipeline::processor::OcrProcessor;
pub use pipeline::state::{ProcessingState, RetryState, Status};
pub use pipeline::transport::{OcrTransport, WebhookTransport};
pub use progress::{NoopProgress, ProcessingProgress, ProgressCallback};
pub use search::engine::SearchResult;
pub use search::highlight::Segment;
pub use search::session::{SearchSession, SearchState};
pub use stats::TextStats;
