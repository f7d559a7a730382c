//! Section summarisation: chunks → one summary per review section.
//!
//! For every configured section and every chunk, a section-specific prompt is
//! sent to the [`Summarize`] capability. Chunk outputs are reduced by plain
//! concatenation in chunk order. An empty answer means the chunk had nothing
//! for that section and adds nothing. A failed call drops only that chunk's
//! contribution and is reported as a [`SummarizationError`]; the section is
//! still built from the chunks that succeeded.
//!
//! The production capability is [`LlmSummarizer`], a thin wrapper over an
//! `edgequake-llm` provider. All prompt wording lives in [`crate::prompts`].

use crate::config::ReviewConfig;
use crate::error::{SummarizationError, SummarizeError};
use crate::output::{SectionSummary, TextChunk};
use crate::prompts::{section_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::section::Section;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use futures::future::{self, BoxFuture, FutureExt};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// The text-generation capability: one prompt in, one summary out.
///
/// Implementations may fail or return degraded output; the pipeline contains
/// those failures per chunk. Object-safe so it can be stored as
/// `Arc<dyn Summarize>`.
pub trait Summarize: Send + Sync {
    fn summarize<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, SummarizeError>>;

    /// Cumulative token usage, for implementations that track it.
    fn usage(&self) -> Option<TokenUsage> {
        None
    }
}

/// Prompt and completion tokens consumed so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Usage accumulated since `earlier` was sampled.
    pub fn since(self, earlier: TokenUsage) -> TokenUsage {
        TokenUsage {
            input_tokens: self.input_tokens.saturating_sub(earlier.input_tokens),
            output_tokens: self.output_tokens.saturating_sub(earlier.output_tokens),
        }
    }
}

// ── Closure adapter ──────────────────────────────────────────────────────

/// [`Summarize`] implemented by a synchronous closure. Built by [`summarize_fn`].
pub struct SummarizeFn<F>(F);

/// Wrap a closure as a summarisation capability.
///
/// ```rust
/// use edgequake_sysreview::{summarize_fn, SummarizeError};
///
/// let first_words = summarize_fn(|prompt: &str| {
///     let body = prompt.lines().nth(1).unwrap_or_default();
///     Ok::<_, SummarizeError>(body.split_whitespace().take(5).collect::<Vec<_>>().join(" "))
/// });
/// # let _ = first_words;
/// ```
pub fn summarize_fn<F>(f: F) -> SummarizeFn<F>
where
    F: Fn(&str) -> Result<String, SummarizeError> + Send + Sync,
{
    SummarizeFn(f)
}

impl<F> Summarize for SummarizeFn<F>
where
    F: Fn(&str) -> Result<String, SummarizeError> + Send + Sync,
{
    fn summarize<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, SummarizeError>> {
        future::ready((self.0)(prompt)).boxed()
    }
}

// ── LLM adapter ──────────────────────────────────────────────────────────

/// Summarises through an `edgequake-llm` provider.
///
/// ## Message Layout
///
/// 1. **System message**: [`DEFAULT_SYSTEM_PROMPT`] or the configured override
/// 2. **User message**: section instruction followed by the chunk text
///
/// There is no retry: a failed call is reported to the pipeline, which drops
/// that chunk's contribution and moves on.
pub struct LlmSummarizer {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &ReviewConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
        }
    }
}

impl Summarize for LlmSummarizer {
    fn summarize<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, SummarizeError>> {
        async move {
            let start = Instant::now();
            let messages = vec![
                ChatMessage::system(self.system_prompt.as_str()),
                ChatMessage::user(prompt),
            ];

            let response = self
                .provider
                .chat(&messages, Some(&self.options))
                .await
                .map_err(|e| SummarizeError::Provider(e.to_string()))?;

            self.input_tokens
                .fetch_add(response.prompt_tokens as u64, Ordering::Relaxed);
            self.output_tokens
                .fetch_add(response.completion_tokens as u64, Ordering::Relaxed);
            debug!(
                "{} input tokens, {} output tokens, {:?}",
                response.prompt_tokens,
                response.completion_tokens,
                start.elapsed()
            );

            Ok(response.content)
        }
        .boxed()
    }

    fn usage(&self) -> Option<TokenUsage> {
        Some(TokenUsage {
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
        })
    }
}

/// Build `CompletionOptions` from the review config.
fn build_options(config: &ReviewConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

// ── Section loop ─────────────────────────────────────────────────────────

/// Result of summarising one document's chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionOutcome {
    /// One entry per requested section.
    pub summaries: BTreeMap<Section, SectionSummary>,
    /// Chunk contributions that were dropped.
    pub warnings: Vec<SummarizationError>,
    /// Number of summariser invocations made.
    pub calls: usize,
}

/// Summarise `chunks` for every section in `sections`.
///
/// Sections are processed in the given order and chunks in sequence order,
/// one awaited call at a time. Blank chunks are not sent to the model, and a
/// blank answer contributes nothing without being a failure. With no chunks
/// every section's summary is the empty string.
///
/// With `dedupe` set, repeated sentences within a section are dropped after
/// concatenation (see [`dedupe_sentences`]).
pub async fn summarize_sections(
    chunks: &[TextChunk],
    sections: &[Section],
    summarizer: &dyn Summarize,
    dedupe: bool,
) -> SectionOutcome {
    let mut outcome = SectionOutcome::default();

    for &section in sections {
        let mut parts: Vec<String> = Vec::new();
        let mut failed = 0;

        for chunk in chunks {
            if chunk.text.trim().is_empty() {
                continue;
            }
            let prompt = section_prompt(section, &chunk.text);
            outcome.calls += 1;

            match summarizer.summarize(&prompt).await {
                Ok(out) if out.trim().is_empty() => {
                    debug!("{} chunk {}: nothing relevant", section, chunk.index);
                }
                Ok(out) => parts.push(out.trim().to_string()),
                Err(source) => {
                    warn!("{} chunk {}: dropped, {}", section, chunk.index, source);
                    failed += 1;
                    outcome.warnings.push(SummarizationError {
                        section,
                        chunk: chunk.index,
                        source,
                    });
                }
            }
        }

        let mut text = parts.join(" ");
        if dedupe {
            text = dedupe_sentences(&text);
        }
        debug!(
            "{}: {} chunk summaries, {} failed, {} chars",
            section,
            parts.len(),
            failed,
            text.len()
        );

        outcome.summaries.insert(
            section,
            SectionSummary {
                section,
                text,
                chunks_used: parts.len(),
                chunks_failed: failed,
            },
        );
    }

    outcome
}

static RE_SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Drop repeated sentences, keeping the first occurrence of each.
///
/// Sentences end at `.`, `!` or `?` followed by whitespace. Comparison is on
/// the trimmed sentence, case-insensitive.
pub fn dedupe_sentences(text: &str) -> String {
    let mut sentences: Vec<&str> = Vec::new();
    let mut last = 0;
    for m in RE_SENTENCE_END.find_iter(text) {
        sentences.push(&text[last..m.start() + 1]);
        last = m.end();
    }
    if last < text.len() {
        sentences.push(&text[last..]);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let kept: Vec<&str> = sentences
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect();
    kept.join(" ")
}
