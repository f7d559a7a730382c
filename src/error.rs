//! Error types for the edgequake-sysreview library.
//!
//! Failures fall into two groups:
//!
//! * [`ReviewError`]: **Fatal**: the batch cannot run or its result cannot
//!   be exported (bad configuration, provider not configured, input file
//!   missing, malformed aggregate). Returned as `Err(ReviewError)` from the
//!   top-level `review*` functions.
//!
//! * [`ExtractionError`] and [`SummarizationError`]: **Non-fatal**: one
//!   document could not be read, or one chunk of one section could not be
//!   summarised. They are collected as [`crate::output::ReviewIssue`]s next to
//!   the best-effort review instead of unwinding the batch.
//!
//! [`SerializationError`] is kept separate so the exporter can be used on its
//! own; it converts into [`ReviewError`] with `?`.

use crate::section::Section;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-sysreview library.
#[derive(Debug, Error)]
pub enum ReviewError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Any other I/O failure while reading an input (a directory, EIO...).
    #[error("Failed to read input '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs the pdfium shared library. You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium next to the executable's working directory.\n\
  • Install pdfium system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// The aggregated review could not be serialised.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A document whose text could not be extracted.
///
/// The document is left out of the aggregate; its identifier is kept so the
/// failure stays visible to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExtractionError {
    /// The payload does not start with the `%PDF` magic bytes.
    #[error("'{document}' is not a PDF (first bytes: {magic:?})")]
    NotAPdf { document: String, magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("'{document}' is corrupt: {detail}")]
    Corrupt { document: String, detail: String },

    /// PDF requires a password but none was configured.
    #[error("'{document}' is encrypted and requires a password")]
    PasswordRequired { document: String },

    /// A password was configured but it does not open this document.
    #[error("Wrong password for '{document}'")]
    WrongPassword { document: String },

    /// Anything else reported by the extraction capability.
    #[error("'{document}': {detail}")]
    Other { document: String, detail: String },
}

impl ExtractionError {
    /// Identifier of the document that failed.
    pub fn document(&self) -> &str {
        match self {
            ExtractionError::NotAPdf { document, .. }
            | ExtractionError::Corrupt { document, .. }
            | ExtractionError::PasswordRequired { document }
            | ExtractionError::WrongPassword { document }
            | ExtractionError::Other { document, .. } => document,
        }
    }
}

/// Failure reported by a [`crate::pipeline::summarize::Summarize`] capability
/// for a single prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SummarizeError {
    /// The model backend returned an error (network, API, content filter…).
    #[error("model call failed: {0}")]
    Provider(String),
}

/// One chunk's contribution to one section that had to be dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{section} (chunk {chunk}): {source}")]
pub struct SummarizationError {
    pub section: Section,
    /// 0-based chunk index.
    pub chunk: usize,
    pub source: SummarizeError,
}

/// The aggregated review cannot be turned into JSON.
#[derive(Debug, Error)]
pub enum SerializationError {
    /// Two documents share one identifier, so the keyed export would lose one.
    #[error("Duplicate document identifier '{document}' in aggregated review")]
    DuplicateDocument { document: String },

    /// serde_json refused the value.
    #[error("JSON serialisation failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_error_names_document() {
        let e = ExtractionError::PasswordRequired {
            document: "locked.pdf".into(),
        };
        assert_eq!(e.document(), "locked.pdf");
        assert!(e.to_string().contains("locked.pdf"));
    }

    #[test]
    fn not_a_pdf_display_shows_magic() {
        let e = ExtractionError::NotAPdf {
            document: "notes.txt".into(),
            magic: b"Hell".to_vec(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.txt"), "got: {msg}");
        assert!(msg.contains("72"), "got: {msg}");
    }

    #[test]
    fn summarization_error_display() {
        let e = SummarizationError {
            section: Section::Methods,
            chunk: 2,
            source: SummarizeError::Provider("HTTP 500".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("Methods"), "got: {msg}");
        assert!(msg.contains("chunk 2"), "got: {msg}");
        assert!(msg.contains("HTTP 500"), "got: {msg}");
    }

    #[test]
    fn serialization_error_converts_to_review_error() {
        let e: ReviewError = SerializationError::DuplicateDocument {
            document: "a.pdf".into(),
        }
        .into();
        assert!(e.to_string().contains("a.pdf"));
    }
}
