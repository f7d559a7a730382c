//! Configuration types for a review run.
//!
//! All pipeline behaviour is controlled through [`ReviewConfig`], built via
//! its [`ReviewConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config across runs, log it, and diff two runs to
//! understand why their reviews differ.
//!
//! The two external capabilities (text extraction and summarisation) can be
//! injected here as trait objects. When they are absent the top-level
//! [`crate::review::review`] builds the production adapters: pdfium for
//! extraction and an `edgequake-llm` provider for summarisation.

use crate::error::ReviewError;
use crate::pipeline::extract::ExtractText;
use crate::pipeline::summarize::Summarize;
use crate::progress::ProgressCallback;
use crate::section::Section;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Configuration for a systematic-review run.
///
/// # Example
/// ```rust
/// use edgequake_sysreview::{LengthUnit, ReviewConfig, Section};
///
/// let config = ReviewConfig::builder()
///     .max_chunk_len(2000)
///     .length_unit(LengthUnit::Chars)
///     .sections(Section::ALL)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// assert_eq!(config.sections.len(), 9);
/// ```
#[derive(Clone)]
pub struct ReviewConfig {
    /// Maximum chunk length, measured in `length_unit`. Default: 1024.
    ///
    /// Must not exceed what the summarisation model accepts as input, minus
    /// the section instruction that is prepended to every chunk.
    pub max_chunk_len: usize,

    /// How chunk length is measured. Default: [`LengthUnit::ApproxTokens`].
    pub length_unit: LengthUnit,

    /// Sections to summarise, in order, without duplicates.
    /// Default: [`Section::CORE`] (Abstract, Methods, Results).
    pub sections: Vec<Section>,

    /// LLM model identifier, e.g. "gpt-4.1-nano". If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed summarisation capability. Takes precedence over every
    /// provider setting; tests inject deterministic stubs here.
    pub summarizer: Option<Arc<dyn Summarize>>,

    /// Pre-constructed extraction capability. If None, pdfium is used.
    pub extractor: Option<Arc<dyn ExtractText>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Summaries should stay faithful to the excerpt, so keep this low.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per chunk summary. Default: 256.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Drop sentences repeated across chunks of the same section. Default: false.
    ///
    /// Only applies within one section of one document; documents are never
    /// de-duplicated against each other.
    pub dedupe_sentences: bool,

    /// Receives per-document progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_chunk_len: 1024,
            length_unit: LengthUnit::default(),
            sections: Section::CORE.to_vec(),
            model: None,
            provider_name: None,
            provider: None,
            summarizer: None,
            extractor: None,
            temperature: 0.1,
            max_tokens: 256,
            system_prompt: None,
            password: None,
            dedupe_sentences: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ReviewConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewConfig")
            .field("max_chunk_len", &self.max_chunk_len)
            .field("length_unit", &self.length_unit)
            .field("sections", &self.sections)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("summarizer", &self.summarizer.as_ref().map(|_| "<dyn Summarize>"))
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn ExtractText>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("dedupe_sentences", &self.dedupe_sentences)
            .finish()
    }
}

impl ReviewConfig {
    /// Create a new builder for `ReviewConfig`.
    pub fn builder() -> ReviewConfigBuilder {
        ReviewConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ReviewConfig`].
#[derive(Debug)]
pub struct ReviewConfigBuilder {
    config: ReviewConfig,
}

impl ReviewConfigBuilder {
    pub fn max_chunk_len(mut self, n: usize) -> Self {
        self.config.max_chunk_len = n;
        self
    }

    pub fn length_unit(mut self, unit: LengthUnit) -> Self {
        self.config.length_unit = unit;
        self
    }

    /// Replace the section schema. Duplicates are dropped, first occurrence wins.
    pub fn sections(mut self, sections: impl IntoIterator<Item = Section>) -> Self {
        let mut list: Vec<Section> = Vec::new();
        for s in sections {
            if !list.contains(&s) {
                list.push(s);
            }
        }
        self.config.sections = list;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn Summarize>) -> Self {
        self.config.summarizer = Some(summarizer);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn ExtractText>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn dedupe_sentences(mut self, v: bool) -> Self {
        self.config.dedupe_sentences = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ReviewConfig, ReviewError> {
        let c = &self.config;
        if c.max_chunk_len == 0 {
            return Err(ReviewError::InvalidConfig(
                "max_chunk_len must be ≥ 1".into(),
            ));
        }
        if c.sections.is_empty() {
            return Err(ReviewError::InvalidConfig(
                "at least one section is required".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Unit in which chunk length is measured.
///
/// Different models impose their input limit in different units, so the
/// chunker never hard-codes one.
///
/// | Unit | Length of a string |
/// |------|--------------------|
/// | `Chars` | Unicode scalar values |
/// | `Words` | whitespace-separated words (whitespace itself is free) |
/// | `ApproxTokens` | ⌈chars / 4⌉, the usual English-text estimate for BPE tokenisers (default) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Chars,
    Words,
    #[default]
    ApproxTokens,
}

impl LengthUnit {
    /// Length of a span containing `chars` characters and `words` words.
    pub fn measure(self, chars: usize, words: usize) -> usize {
        match self {
            LengthUnit::Chars => chars,
            LengthUnit::Words => words,
            LengthUnit::ApproxTokens => chars.div_ceil(4),
        }
    }

    /// Length of `text` in this unit.
    pub fn len_of(self, text: &str) -> usize {
        self.measure(text.chars().count(), text.split_whitespace().count())
    }
}

impl FromStr for LengthUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chars" | "characters" => Ok(LengthUnit::Chars),
            "words" => Ok(LengthUnit::Words),
            "tokens" | "approx_tokens" | "approx-tokens" => Ok(LengthUnit::ApproxTokens),
            other => Err(format!("unknown length unit '{other}' (expected chars, words, or tokens)")),
        }
    }
}
