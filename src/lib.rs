//! # edgequake-sysreview
//!
//! Turn a batch of research-paper PDFs into one structured systematic review.
//!
//! Each paper's text is extracted, cleaned, split into chunks that fit the
//! model's input limit, and summarised once per review section (Abstract,
//! Methods, Results, optionally the full systematic-review schema). The
//! per-paper reviews are combined into one [`AggregatedReview`] and exported
//! as reproducible JSON.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDFs
//!  │
//!  ├─ 1. Extract    text layer via pdfium (CPU-bound, spawn_blocking)
//!  ├─ 2. Normalise  whitespace, ligatures, invisible characters
//!  ├─ 3. Chunk      bounded slices in chars / words / ≈tokens
//!  ├─ 4. Summarise  one LLM call per (section, chunk), concatenated
//!  ├─ 5. Aggregate  per-document reviews + per-section consolidation
//!  └─ 6. Export     JSON with sorted keys
//! ```
//!
//! Failures are contained: an unreadable PDF is skipped and reported, a
//! failed model call drops only that chunk's contribution. Both show up in
//! [`BatchOutcome::issues`] next to the best-effort review.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_sysreview::{review_files, to_json, ReviewConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let config = ReviewConfig::default();
//!     let outcome = review_files(&["a.pdf", "b.pdf"], &config).await?;
//!     std::io::Write::write_all(&mut std::io::stdout(), &to_json(&outcome.review)?)?;
//!     for issue in &outcome.issues {
//!         eprintln!("{}: {}", issue.document_id, issue.message);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Plugging in your own capabilities
//!
//! Text extraction and summarisation are traits ([`ExtractText`],
//! [`Summarize`]). Inject closures for tests or alternative backends:
//!
//! ```rust
//! use edgequake_sysreview::{
//!     extract_fn, review_documents, summarize_fn, to_json, RawDocument, ReviewConfig,
//! };
//!
//! let extractor = extract_fn(|doc: &RawDocument| Ok(String::from_utf8_lossy(doc.bytes()).into_owned()));
//! let summarizer = summarize_fn(|_prompt: &str| Ok("A randomised trial.".to_string()));
//! let docs = [RawDocument::new("paper.pdf", b"We randomised 200 patients.".to_vec())];
//!
//! let outcome = tokio_test::block_on(review_documents(
//!     &docs,
//!     &extractor,
//!     &summarizer,
//!     &ReviewConfig::default(),
//! ));
//! let json = String::from_utf8(to_json(&outcome.review).unwrap()).unwrap();
//! assert!(json.contains("\"Methods\": \"A randomised trial.\""));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `sysreview` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! edgequake-sysreview = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod review;
pub mod section;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{LengthUnit, ReviewConfig, ReviewConfigBuilder};
pub use error::{ExtractionError, ReviewError, SerializationError, SummarizationError, SummarizeError};
pub use output::{
    AggregatedReview, BatchOutcome, BatchStats, DocumentOutcome, DocumentReview, IssueKind,
    RawDocument, ReviewIssue, SectionSummary, TextChunk,
};
pub use pipeline::aggregate::aggregate;
pub use pipeline::chunk::chunk;
pub use pipeline::export::{to_json, to_json_value, to_json_with_layout, ExportLayout};
pub use pipeline::extract::{extract_fn, ExtractFn, ExtractText, PdfiumExtractor};
pub use pipeline::normalize::normalize;
pub use pipeline::summarize::{
    summarize_fn, summarize_sections, LlmSummarizer, SectionOutcome, Summarize, SummarizeFn,
    TokenUsage,
};
pub use progress::{NoopProgressCallback, ProgressCallback, ReviewProgressCallback};
pub use review::{
    build_review, read_documents, review, review_documents, review_files, review_sync,
    review_to_file, write_atomic,
};
pub use section::Section;
