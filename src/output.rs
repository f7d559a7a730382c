//! Data model flowing through the review pipeline, from uploaded bytes to the
//! batch outcome handed back to the caller.

use crate::error::{ExtractionError, SummarizationError};
use crate::section::Section;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Input ────────────────────────────────────────────────────────────────

/// An uploaded document: identifier (usually the file name) and raw bytes.
///
/// The pipeline only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    id: String,
    bytes: Vec<u8>,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            bytes: bytes.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

// ── Intermediate ─────────────────────────────────────────────────────────

/// A contiguous slice of a document's normalised text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    /// 0-based position in the document's chunk sequence.
    pub index: usize,
    /// Byte offset of `text` inside the normalised text.
    pub offset: usize,
    pub text: String,
}

// ── Per-document output ──────────────────────────────────────────────────

/// The summary produced for one section of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub section: Section,
    pub text: String,
    /// Chunks whose model output went into `text`.
    pub chunks_used: usize,
    /// Chunks whose model call failed and were skipped.
    pub chunks_failed: usize,
}

impl SectionSummary {
    /// A summary with no content, used when a document has no chunks.
    pub fn empty(section: Section) -> Self {
        Self {
            section,
            text: String::new(),
            chunks_used: 0,
            chunks_failed: 0,
        }
    }
}

/// The structured review of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReview {
    pub id: String,
    pub sections: BTreeMap<Section, SectionSummary>,
    /// Number of chunks the normalised text was split into.
    pub chunk_count: usize,
}

impl DocumentReview {
    /// Summary text for `section`, or `None` if the section was not requested.
    pub fn summary(&self, section: Section) -> Option<&str> {
        self.sections.get(&section).map(|s| s.text.as_str())
    }
}

/// A successfully built review together with the chunk-level failures that
/// degraded it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub review: DocumentReview,
    pub warnings: Vec<SummarizationError>,
    /// Summariser invocations made for this document.
    pub summarizer_calls: usize,
}

// ── Batch output ─────────────────────────────────────────────────────────

/// Every document's review, in upload order, plus the per-section
/// cross-document concatenation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedReview {
    pub documents: Vec<DocumentReview>,
    /// For each section present in any document: every document's summary,
    /// in document order, joined with a single space. Empty summaries are
    /// skipped.
    pub consolidated: BTreeMap<Section, String>,
}

impl AggregatedReview {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Look up a document's review by identifier.
    pub fn get(&self, id: &str) -> Option<&DocumentReview> {
        self.documents.iter().find(|d| d.id == id)
    }

    /// Document identifiers in upload order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|d| d.id.as_str())
    }
}

/// What went wrong for a degraded or skipped document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// The document was skipped entirely.
    Extraction,
    /// One chunk's contribution to one section was dropped.
    Summarization,
}

/// A contained failure reported alongside the review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewIssue {
    pub document_id: String,
    pub kind: IssueKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<usize>,
    pub message: String,
}

impl ReviewIssue {
    pub fn from_extraction(err: &ExtractionError) -> Self {
        Self {
            document_id: err.document().to_string(),
            kind: IssueKind::Extraction,
            section: None,
            chunk: None,
            message: err.to_string(),
        }
    }

    pub fn from_summarization(document_id: &str, err: &SummarizationError) -> Self {
        Self {
            document_id: document_id.to_string(),
            kind: IssueKind::Summarization,
            section: Some(err.section),
            chunk: Some(err.chunk),
            message: err.source.to_string(),
        }
    }
}

/// Counters for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_documents: usize,
    pub reviewed_documents: usize,
    pub failed_documents: usize,
    pub total_chunks: usize,
    pub summarizer_calls: usize,
    pub failed_calls: usize,
    /// Prompt tokens reported by the summariser, if it reports usage.
    pub total_input_tokens: u64,
    /// Completion tokens reported by the summariser, if it reports usage.
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// Everything a batch run returns: the best-effort review, the issues that
/// degraded it, and run statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub review: AggregatedReview,
    pub issues: Vec<ReviewIssue>,
    pub stats: BatchStats,
}

impl BatchOutcome {
    /// Identifiers of documents that were skipped because extraction failed.
    pub fn failed_documents(&self) -> impl Iterator<Item = &str> {
        self.issues
            .iter()
            .filter(|i| i.kind == IssueKind::Extraction)
            .map(|i| i.document_id.as_str())
    }
}
