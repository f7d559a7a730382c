//! CLI binary for edgequake-sysreview.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ReviewConfig`, runs the batch and prints the JSON review.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_sysreview::{
    read_documents, review, to_json_value, to_json_with_layout, write_atomic, ExportLayout,
    IssueKind, LengthUnit, ProgressCallback, ReviewConfig, ReviewProgressCallback, Section,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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

/// Terminal progress callback: one bar over the batch plus a log line per
/// document.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-document wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// Create a callback whose bar length is set by `on_batch_start`.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Loading documents…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} documents  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Reviewing");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap()
            .remove(&index)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ReviewProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting review of {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, index: usize, _total: usize, id: &str) {
        self.start_times
            .lock()
            .unwrap()
            .insert(index, Instant::now());
        self.bar.set_message(id.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, id: &str, warnings: usize) {
        let secs = self.elapsed_secs(index);
        let note = if warnings == 0 {
            String::new()
        } else {
            cyan(&format!("{warnings} chunk summaries dropped"))
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            green("✓"),
            index + 1,
            total,
            id,
            dim(&format!("{secs:.1}s")),
            note,
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, id: &str, error: &str) {
        let secs = self.elapsed_secs(index);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            red("✗"),
            index + 1,
            total,
            id,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, reviewed: usize) {
        self.bar.finish_and_clear();
        eprintln!("{}", batch_summary(total_documents, reviewed));
    }
}

/// Final status line; failures are derived from the reviewed count.
fn batch_summary(total_documents: usize, reviewed: usize) -> String {
    let failed = total_documents.saturating_sub(reviewed);
    if failed == 0 {
        format!(
            "{} {} documents reviewed successfully",
            green("✔"),
            bold(&reviewed.to_string())
        )
    } else {
        format!(
            "{} {}/{} documents reviewed  ({} failed)",
            if failed == total_documents {
                red("✘")
            } else {
                cyan("⚠")
            },
            bold(&reviewed.to_string()),
            total_documents,
            red(&failed.to_string()),
        )
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Review three papers (JSON on stdout)
  sysreview a.pdf b.pdf c.pdf

  # Write the review to a file
  sysreview papers/*.pdf -o review.json

  # One merged summary per section instead of one entry per paper
  sysreview papers/*.pdf --layout consolidated -o merged.json

  # Full systematic-review schema
  sysreview --sections all papers/*.pdf

  # Pick sections explicitly
  sysreview --sections "abstract,inclusion criteria,results" paper.pdf

  # Smaller chunks measured in words, with a specific model
  sysreview --max-chunk-len 400 --length-unit words --model gpt-4.1-mini paper.pdf

  # Full outcome (review + issues + stats) as JSON
  sysreview --report papers/*.pdf > outcome.json

SECTIONS:
  core (default)   Abstract, Methods, Results
  all              core + Research Question, Search Strategy, Inclusion Criteria,
                   Exclusion Criteria, Data Extraction, Data Synthesis

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium

SETUP:
  1. Set API key:     export OPENAI_API_KEY=sk-...
  2. Review:          sysreview paper.pdf -o review.json

  Text extraction needs the pdfium shared library, either next to the
  working directory, installed system-wide, or named by PDFIUM_LIB_PATH.
"#;

/// Summarise research-paper PDFs into one structured systematic review.
#[derive(Parser, Debug)]
#[command(
    name = "sysreview",
    version,
    about = "Summarise research-paper PDFs into one structured systematic review",
    long_about = "Extract the text of each PDF, split it into model-sized chunks, summarise \
every chunk for each review section (Abstract, Methods, Results, …) with an LLM, and write \
the combined review as JSON. Supports OpenAI, Anthropic, Google Gemini, Azure OpenAI, and \
any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files to review. Each document is identified by its file name.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "SYSREVIEW_OUTPUT")]
    output: Option<PathBuf>,

    /// Export layout: documents (one entry per paper) or consolidated.
    #[arg(long, env = "SYSREVIEW_LAYOUT", default_value = "documents")]
    layout: ExportLayout,

    /// Sections: core, all, or a comma-separated list of section names.
    #[arg(long, env = "SYSREVIEW_SECTIONS", default_value = "core")]
    sections: String,

    /// Maximum chunk length, in --length-unit.
    #[arg(long, env = "SYSREVIEW_MAX_CHUNK_LEN", default_value_t = 1024,
          value_parser = clap::value_parser!(u64).range(1..))]
    max_chunk_len: u64,

    /// How chunk length is measured: chars, words, or tokens (≈ chars/4).
    #[arg(long, env = "SYSREVIEW_LENGTH_UNIT", default_value = "tokens")]
    length_unit: LengthUnit,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Max LLM output tokens per chunk summary.
    #[arg(long, env = "SYSREVIEW_MAX_TOKENS", default_value_t = 256)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "SYSREVIEW_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SYSREVIEW_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SYSREVIEW_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Drop sentences repeated within one section of one document.
    #[arg(long, env = "SYSREVIEW_DEDUPE_SENTENCES")]
    dedupe_sentences: bool,

    /// Output the full outcome (review, issues, stats) instead of the review.
    #[arg(long, env = "SYSREVIEW_REPORT")]
    report: bool,

    /// Disable progress bar.
    #[arg(long, env = "SYSREVIEW_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SYSREVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SYSREVIEW_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
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
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ReviewProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run review ───────────────────────────────────────────────────────
    let docs = read_documents(&cli.inputs)
        .await
        .context("Failed to read input files")?;
    let outcome = review(&docs, &config).await.context("Review failed")?;

    // Serialise before touching the output so a failure leaves nothing behind.
    let json = if cli.report {
        let value = serde_json::to_value(&outcome).context("Failed to serialise outcome")?;
        to_json_value(&value).context("Failed to serialise outcome")?
    } else {
        to_json_with_layout(&outcome.review, cli.layout).context("Failed to serialise review")?
    };

    if let Some(ref output_path) = cli.output {
        write_atomic(output_path, &json).context("Failed to write review")?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(&json).context("Failed to write to stdout")?;
    }

    // ── Issues and summary ───────────────────────────────────────────────
    if !cli.quiet {
        for issue in &outcome.issues {
            let location = match (issue.section, issue.chunk) {
                (Some(section), Some(chunk)) => format!(" [{section}, chunk {chunk}]"),
                (Some(section), None) => format!(" [{section}]"),
                _ => String::new(),
            };
            let marker = match issue.kind {
                IssueKind::Extraction => red("✗"),
                IssueKind::Summarization => cyan("⚠"),
            };
            eprintln!("{} {}{}: {}", marker, issue.document_id, location, issue.message);
        }

        let stats = &outcome.stats;
        let destination = cli
            .output
            .as_ref()
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default();
        eprintln!(
            "{}  {}/{} documents  {} chunks  {}ms{}",
            if stats.failed_documents == 0 && stats.failed_calls == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.reviewed_documents,
            stats.total_documents,
            stats.total_chunks,
            stats.total_duration_ms,
            destination,
        );
        eprintln!(
            "   {} calls ({} failed)  /  {} tokens in  /  {} tokens out",
            dim(&stats.summarizer_calls.to_string()),
            dim(&stats.failed_calls.to_string()),
            dim(&stats.total_input_tokens.to_string()),
            dim(&stats.total_output_tokens.to_string()),
        );
    }

    if outcome.stats.total_documents > 0 && outcome.stats.reviewed_documents == 0 {
        anyhow::bail!(
            "All {} documents failed text extraction",
            outcome.stats.total_documents
        );
    }

    Ok(())
}

/// Map CLI args to `ReviewConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ReviewConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let sections = parse_sections(&cli.sections)?;

    let mut builder = ReviewConfig::builder()
        .max_chunk_len(usize::try_from(cli.max_chunk_len).unwrap_or(usize::MAX))
        .length_unit(cli.length_unit)
        .sections(sections)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .dedupe_sentences(cli.dedupe_sentences);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--sections` into a section list.
fn parse_sections(s: &str) -> Result<Vec<Section>> {
    match s.trim().to_lowercase().as_str() {
        "core" | "" => Ok(Section::CORE.to_vec()),
        "all" => Ok(Section::ALL.to_vec()),
        _ => s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| part.parse::<Section>().map_err(anyhow::Error::msg))
            .collect(),
    }
}
