//! Text extraction: uploaded PDF bytes → plain text.
//!
//! The pipeline only depends on the [`ExtractText`] capability. The production
//! implementation, [`PdfiumExtractor`], reads the PDF text layer through
//! pdfium; tests plug in closures via [`extract_fn`].
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and keeps
//! thread-local state. `tokio::task::spawn_blocking` moves the parse onto the
//! blocking pool so the async worker threads never stall on a large PDF.

use crate::error::{ExtractionError, ReviewError};
use crate::output::RawDocument;
use futures::future::{self, BoxFuture, FutureExt};
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, warn};

/// The PDF-parsing capability.
///
/// Returns best-effort plain text; an empty string is a valid result for a
/// document without a text layer. Object-safe so it can be stored as
/// `Arc<dyn ExtractText>`.
pub trait ExtractText: Send + Sync {
    fn extract_text<'a>(
        &'a self,
        doc: &'a RawDocument,
    ) -> BoxFuture<'a, Result<String, ExtractionError>>;
}

// ── Closure adapter ──────────────────────────────────────────────────────

/// [`ExtractText`] implemented by a synchronous closure. Built by [`extract_fn`].
pub struct ExtractFn<F>(F);

/// Wrap a closure as an extraction capability.
///
/// ```rust
/// use edgequake_sysreview::{extract_fn, RawDocument};
///
/// let plain_text = extract_fn(|doc: &RawDocument| {
///     Ok(String::from_utf8_lossy(doc.bytes()).into_owned())
/// });
/// # let _ = plain_text;
/// ```
pub fn extract_fn<F>(f: F) -> ExtractFn<F>
where
    F: Fn(&RawDocument) -> Result<String, ExtractionError> + Send + Sync,
{
    ExtractFn(f)
}

impl<F> ExtractText for ExtractFn<F>
where
    F: Fn(&RawDocument) -> Result<String, ExtractionError> + Send + Sync,
{
    fn extract_text<'a>(
        &'a self,
        doc: &'a RawDocument,
    ) -> BoxFuture<'a, Result<String, ExtractionError>> {
        future::ready((self.0)(doc)).boxed()
    }
}

// ── Pdfium adapter ───────────────────────────────────────────────────────

/// Extracts the text layer of each page with pdfium.
///
/// Pages are joined with a newline. Pages whose text cannot be read are
/// skipped with a warning; a document that cannot be opened at all is an
/// [`ExtractionError`].
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    /// Explicit path to the pdfium shared library. If None, `./` and then the
    /// system library are tried.
    library_path: Option<PathBuf>,
    password: Option<String>,
}

impl PdfiumExtractor {
    pub fn new(library_path: Option<PathBuf>, password: Option<String>) -> Self {
        Self {
            library_path,
            password,
        }
    }

    /// Honour `PDFIUM_LIB_PATH` when set.
    pub fn from_env(password: Option<String>) -> Self {
        let library_path = std::env::var_os("PDFIUM_LIB_PATH")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self::new(library_path, password)
    }

    /// Bind to pdfium once, so a missing library is reported as a single fatal
    /// error instead of one extraction failure per document.
    pub async fn check_binding(&self) -> Result<(), ReviewError> {
        let library_path = self.library_path.clone();
        tokio::task::spawn_blocking(move || bind_pdfium(library_path.as_ref()).map(drop))
            .await
            .map_err(|e| ReviewError::Internal(format!("Pdfium bind task panicked: {e}")))?
            .map_err(ReviewError::PdfiumBindingFailed)
    }
}

impl ExtractText for PdfiumExtractor {
    fn extract_text<'a>(
        &'a self,
        doc: &'a RawDocument,
    ) -> BoxFuture<'a, Result<String, ExtractionError>> {
        async move {
            check_magic(doc)?;

            let id = doc.id().to_string();
            let bytes = doc.bytes().to_vec();
            let library_path = self.library_path.clone();
            let password = self.password.clone();

            tokio::task::spawn_blocking(move || {
                extract_blocking(&id, bytes, library_path.as_ref(), password.as_deref())
            })
            .await
            .map_err(|e| ExtractionError::Other {
                document: doc.id().to_string(),
                detail: format!("extraction task panicked: {e}"),
            })?
        }
        .boxed()
    }
}

/// Reject payloads that do not start with `%PDF` before handing them to pdfium.
fn check_magic(doc: &RawDocument) -> Result<(), ExtractionError> {
    let bytes = doc.bytes();
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(ExtractionError::NotAPdf {
            document: doc.id().to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

fn bind_pdfium(library_path: Option<&PathBuf>) -> Result<Pdfium, String> {
    let bindings = match library_path {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| format!("{e:?}"))?;
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of text extraction.
fn extract_blocking(
    id: &str,
    bytes: Vec<u8>,
    library_path: Option<&PathBuf>,
    password: Option<&str>,
) -> Result<String, ExtractionError> {
    let pdfium = bind_pdfium(library_path).map_err(|detail| ExtractionError::Other {
        document: id.to_string(),
        detail: format!("pdfium unavailable: {detail}"),
    })?;

    let document = pdfium
        .load_pdf_from_byte_vec(bytes, password)
        .map_err(|e| classify_load_error(id, password.is_some(), format!("{e:?}")))?;

    let mut pages: Vec<String> = Vec::new();
    for (idx, page) in document.pages().iter().enumerate() {
        match page.text() {
            Ok(text) => pages.push(text.all()),
            Err(e) => warn!("'{}': skipping page {}: {:?}", id, idx + 1, e),
        }
    }

    let text = pages.join("\n");
    debug!("'{}': extracted {} pages, {} bytes of text", id, pages.len(), text.len());
    Ok(text)
}

/// Map a pdfium load failure to the matching extraction error.
fn classify_load_error(id: &str, had_password: bool, detail: String) -> ExtractionError {
    if detail.contains("Password") || detail.contains("password") {
        if had_password {
            ExtractionError::WrongPassword {
                document: id.to_string(),
            }
        } else {
            ExtractionError::PasswordRequired {
                document: id.to_string(),
            }
        }
    } else {
        ExtractionError::Corrupt {
            document: id.to_string(),
            detail,
        }
    }
}
