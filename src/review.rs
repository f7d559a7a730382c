//! Batch review entry points.
//!
//! One document at a time goes through extract → normalise → chunk →
//! summarise; the completed reviews are then folded into one
//! [`AggregatedReview`](crate::output::AggregatedReview). A document whose
//! text cannot be extracted is left out and reported as an issue; a chunk
//! whose summary fails only loses its own contribution. Nothing short of a
//! setup error (no provider, no pdfium, unreadable input path) or an export
//! failure makes the batch return `Err`.

use crate::config::ReviewConfig;
use crate::error::{ExtractionError, ReviewError};
use crate::output::{BatchOutcome, BatchStats, DocumentOutcome, DocumentReview, RawDocument, ReviewIssue};
use crate::pipeline::aggregate::aggregate;
use crate::pipeline::chunk::chunk;
use crate::pipeline::export::{to_json_with_layout, ExportLayout};
use crate::pipeline::extract::{ExtractText, PdfiumExtractor};
use crate::pipeline::normalize::normalize;
use crate::pipeline::summarize::{summarize_sections, LlmSummarizer, Summarize};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Build the review of one document.
///
/// Returns `Err` only when text extraction fails. Empty text is not an
/// error: every section summary is then the empty string.
pub async fn build_review(
    raw: &RawDocument,
    extractor: &dyn ExtractText,
    summarizer: &dyn Summarize,
    config: &ReviewConfig,
) -> Result<DocumentOutcome, ExtractionError> {
    let text = extractor.extract_text(raw).await?;
    let text = normalize(&text);
    if text.is_empty() {
        warn!("'{}': no extractable text, summaries will be empty", raw.id());
    }

    let chunks = chunk(&text, config.max_chunk_len, config.length_unit);
    debug!(
        "'{}': {} chars normalised into {} chunks",
        raw.id(),
        text.chars().count(),
        chunks.len()
    );

    let outcome =
        summarize_sections(&chunks, &config.sections, summarizer, config.dedupe_sentences).await;

    Ok(DocumentOutcome {
        review: DocumentReview {
            id: raw.id().to_string(),
            sections: outcome.summaries,
            chunk_count: chunks.len(),
        },
        warnings: outcome.warnings,
        summarizer_calls: outcome.calls,
    })
}

/// Review a batch with explicit capabilities.
///
/// Documents are processed sequentially in input order. Progress events are
/// sent to `config.progress_callback` if set.
pub async fn review_documents(
    docs: &[RawDocument],
    extractor: &dyn ExtractText,
    summarizer: &dyn Summarize,
    config: &ReviewConfig,
) -> BatchOutcome {
    let start = Instant::now();
    let usage_before = summarizer.usage().unwrap_or_default();
    let total = docs.len();
    info!("Starting review of {} documents", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut reviews: Vec<DocumentReview> = Vec::with_capacity(total);
    let mut issues: Vec<ReviewIssue> = Vec::new();
    let mut stats = BatchStats {
        total_documents: total,
        ..Default::default()
    };

    for (index, doc) in docs.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_document_start(index, total, doc.id());
        }

        match build_review(doc, extractor, summarizer, config).await {
            Ok(outcome) => {
                info!(
                    "'{}': reviewed {} sections from {} chunks ({} dropped)",
                    doc.id(),
                    outcome.review.sections.len(),
                    outcome.review.chunk_count,
                    outcome.warnings.len()
                );
                stats.total_chunks += outcome.review.chunk_count;
                stats.summarizer_calls += outcome.summarizer_calls;
                stats.failed_calls += outcome.warnings.len();
                issues.extend(
                    outcome
                        .warnings
                        .iter()
                        .map(|w| ReviewIssue::from_summarization(doc.id(), w)),
                );
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_complete(index, total, doc.id(), outcome.warnings.len());
                }
                reviews.push(outcome.review);
            }
            Err(e) => {
                warn!("Skipping document: {}", e);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_document_error(index, total, doc.id(), &e.to_string());
                }
                issues.push(ReviewIssue::from_extraction(&e));
            }
        }
    }

    stats.reviewed_documents = reviews.len();
    stats.failed_documents = total - reviews.len();
    let usage = summarizer
        .usage()
        .unwrap_or_default()
        .since(usage_before);
    stats.total_input_tokens = usage.input_tokens;
    stats.total_output_tokens = usage.output_tokens;
    stats.total_duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "Review complete: {}/{} documents, {} summariser calls ({} failed), {}ms total",
        stats.reviewed_documents,
        total,
        stats.summarizer_calls,
        stats.failed_calls,
        stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, stats.reviewed_documents);
    }

    BatchOutcome {
        review: aggregate(reviews),
        issues,
        stats,
    }
}

/// Review a batch of in-memory documents.
///
/// This is the primary entry point for the library. Capabilities come from
/// the config when injected; otherwise pdfium and an `edgequake-llm`
/// provider are set up.
///
/// # Errors
/// Returns `Err(ReviewError)` only for fatal errors:
/// - No LLM provider could be configured
/// - The pdfium library could not be loaded
pub async fn review(docs: &[RawDocument], config: &ReviewConfig) -> Result<BatchOutcome, ReviewError> {
    if docs.is_empty() {
        info!("No documents to review");
        return Ok(BatchOutcome::default());
    }

    let summarizer = resolve_summarizer(config).await?;
    let extractor = resolve_extractor(config).await?;

    Ok(review_documents(docs, extractor.as_ref(), summarizer.as_ref(), config).await)
}

/// Read PDF files from disk and review them.
///
/// Each document's identifier is its file name.
pub async fn review_files<P: AsRef<Path>>(
    paths: &[P],
    config: &ReviewConfig,
) -> Result<BatchOutcome, ReviewError> {
    let docs = read_documents(paths).await?;
    review(&docs, config).await
}

/// Review PDF files and write the JSON export to `output_path`.
///
/// Serialisation happens before anything touches the disk, and the file is
/// written atomically, so a failed export never leaves partial output.
pub async fn review_to_file<P: AsRef<Path>>(
    paths: &[P],
    output_path: impl AsRef<Path>,
    layout: ExportLayout,
    config: &ReviewConfig,
) -> Result<BatchOutcome, ReviewError> {
    let outcome = review_files(paths, config).await?;
    let json = to_json_with_layout(&outcome.review, layout)?;

    let path = output_path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic(&path, &json))
        .await
        .map_err(|e| ReviewError::Internal(format!("write task panicked: {e}")))??;

    Ok(outcome)
}

/// Synchronous wrapper around [`review`].
///
/// Creates a temporary tokio runtime internally.
pub fn review_sync(docs: &[RawDocument], config: &ReviewConfig) -> Result<BatchOutcome, ReviewError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ReviewError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(review(docs, config))
}

/// Load files into [`RawDocument`]s, keyed by file name.
///
/// A missing or unreadable path is a caller error and fails the whole call.
pub async fn read_documents<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<RawDocument>, ReviewError> {
    let mut docs = Vec::with_capacity(paths.len());
    for p in paths {
        let path = p.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReviewError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ReviewError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ReviewError::InputReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        docs.push(RawDocument::new(id, bytes));
    }
    Ok(docs)
}

/// Write `bytes` to `path` through a temp file in the same directory, then
/// rename it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ReviewError> {
    let write_err = |source: std::io::Error| ReviewError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn resolve_summarizer(config: &ReviewConfig) -> Result<Arc<dyn Summarize>, ReviewError> {
    if let Some(ref summarizer) = config.summarizer {
        return Ok(Arc::clone(summarizer));
    }
    let provider = resolve_provider(config).await?;
    Ok(Arc::new(LlmSummarizer::new(provider, config)))
}

async fn resolve_extractor(config: &ReviewConfig) -> Result<Arc<dyn ExtractText>, ReviewError> {
    if let Some(ref extractor) = config.extractor {
        return Ok(Arc::clone(extractor));
    }
    let pdfium = PdfiumExtractor::from_env(config.password.clone());
    pdfium.check_binding().await?;
    Ok(Arc::new(pdfium))
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ReviewError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ReviewError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`), created through
///    [`ProviderFactory::create_llm_provider`], which reads the matching API
///    key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`),
///    both non-empty.
/// 4. **OpenAI** when `OPENAI_API_KEY` is set, so a machine with several
///    keys does not pick a provider at random.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
async fn resolve_provider(config: &ReviewConfig) -> Result<Arc<dyn LLMProvider>, ReviewError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ReviewError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SummarizeError;
    use crate::pipeline::extract::extract_fn;
    use crate::pipeline::summarize::{summarize_fn, TokenUsage};
    use crate::section::Section;

    fn text_extractor() -> impl ExtractText {
        extract_fn(|doc: &RawDocument| {
            if doc.bytes().starts_with(b"BROKEN") {
                Err(ExtractionError::Corrupt {
                    document: doc.id().to_string(),
                    detail: "bad xref".into(),
                })
            } else {
                Ok(String::from_utf8_lossy(doc.bytes()).into_owned())
            }
        })
    }

    #[test]
    fn build_review_covers_configured_sections() {
        let s = summarize_fn(|_| Ok("summary".into()));
        let doc = RawDocument::new("a.pdf", b"Some  text\nhere".to_vec());
        let out = tokio_test::block_on(build_review(
            &doc,
            &text_extractor(),
            &s,
            &ReviewConfig::default(),
        ))
        .unwrap();
        assert_eq!(out.review.id, "a.pdf");
        assert_eq!(out.review.chunk_count, 1);
        assert_eq!(
            out.review.sections.keys().copied().collect::<Vec<_>>(),
            Section::CORE.to_vec()
        );
        assert_eq!(out.review.summary(Section::Methods), Some("summary"));
        assert_eq!(out.summarizer_calls, 3);
    }

    #[test]
    fn build_review_with_no_text_is_not_an_error() {
        let s = summarize_fn(|_| Err(SummarizeError::Provider("should not be called".into())));
        let doc = RawDocument::new("blank.pdf", b" \n\t ".to_vec());
        let out = tokio_test::block_on(build_review(
            &doc,
            &text_extractor(),
            &s,
            &ReviewConfig::default(),
        ))
        .unwrap();
        assert_eq!(out.review.chunk_count, 0);
        assert!(out.warnings.is_empty());
        assert_eq!(out.review.summary(Section::Abstract), Some(""));
    }

    #[test]
    fn build_review_propagates_extraction_error() {
        let s = summarize_fn(|_| Ok("x".into()));
        let doc = RawDocument::new("bad.pdf", b"BROKEN".to_vec());
        let err = tokio_test::block_on(build_review(
            &doc,
            &text_extractor(),
            &s,
            &ReviewConfig::default(),
        ))
        .unwrap_err();
        assert_eq!(err.document(), "bad.pdf");
    }

    #[test]
    fn batch_stats_are_counted() {
        let s = summarize_fn(|prompt: &str| {
            if prompt.contains("fail") {
                Err(SummarizeError::Provider("boom".into()))
            } else {
                Ok("ok".into())
            }
        });
        let docs = vec![
            RawDocument::new("a.pdf", b"alpha".to_vec()),
            RawDocument::new("b.pdf", b"BROKEN".to_vec()),
            RawDocument::new("c.pdf", b"fail".to_vec()),
        ];
        let config = ReviewConfig::builder().sections([Section::Abstract]).build().unwrap();
        let out = tokio_test::block_on(review_documents(&docs, &text_extractor(), &s, &config));
        assert_eq!(out.stats.total_documents, 3);
        assert_eq!(out.stats.reviewed_documents, 2);
        assert_eq!(out.stats.failed_documents, 1);
        assert_eq!(out.stats.total_chunks, 2);
        assert_eq!(out.stats.summarizer_calls, 2);
        assert_eq!(out.stats.failed_calls, 1);
        assert_eq!(out.stats.total_input_tokens, 0);
        assert_eq!(out.failed_documents().collect::<Vec<_>>(), ["b.pdf"]);
        assert_eq!(out.issues.len(), 2);
    }

    #[test]
    fn empty_batch_needs_no_provider() {
        let out = tokio_test::block_on(review(&[], &ReviewConfig::default())).unwrap();
        assert!(out.review.is_empty());
        assert!(out.issues.is_empty());
    }

    #[test]
    fn read_documents_missing_file() {
        let err = tokio_test::block_on(read_documents(&["/definitely/not/here.pdf"])).unwrap_err();
        assert!(matches!(err, ReviewError::FileNotFound { .. }));
    }

    #[test]
    fn read_documents_directory_is_not_reported_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = tokio_test::block_on(read_documents(&[dir.path()])).unwrap_err();
        match err {
            ReviewError::InputReadFailed { path, .. } => assert_eq!(path, dir.path()),
            other => panic!("expected InputReadFailed, got {other:?}"),
        }
    }

    #[test]
    fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("review.json");
        write_atomic(&path, b"{}\n").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}\n");
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }

    #[test]
    fn token_usage_defaults_to_zero() {
        assert_eq!(TokenUsage::default().since(TokenUsage::default()), TokenUsage::default());
    }
}
