//! Progress-callback trait for per-document review events.
//!
//! Inject an [`Arc<dyn ReviewProgressCallback>`] via
//! [`crate::config::ReviewConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the batch. Callers can forward them
//! to a terminal progress bar, a channel, or a log without the library
//! knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use edgequake_sysreview::{ReviewConfig, ReviewProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     reviewed: AtomicUsize,
//! }
//!
//! impl ReviewProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, index: usize, total: usize, id: &str, warnings: usize) {
//!         self.reviewed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {id} ({warnings} warnings)", index + 1, total);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { reviewed: AtomicUsize::new(0) });
//!
//! let config = ReviewConfig::builder()
//!     .progress_callback(counter as Arc<dyn ReviewProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the review pipeline as it processes each document.
///
/// Documents are processed one at a time, so events for a batch arrive in
/// order. The trait is still `Send + Sync` so a config carrying a callback
/// can be shared across tasks. All methods default to no-ops.
pub trait ReviewProgressCallback: Send + Sync {
    /// Called once before the first document.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before a document's text is extracted.
    ///
    /// `index` is 0-based.
    fn on_document_start(&self, index: usize, total: usize, id: &str) {
        let _ = (index, total, id);
    }

    /// Called after a document's review is built.
    ///
    /// `warnings` counts the chunk contributions that were dropped.
    fn on_document_complete(&self, index: usize, total: usize, id: &str, warnings: usize) {
        let _ = (index, total, id, warnings);
    }

    /// Called when a document is skipped because extraction failed.
    fn on_document_error(&self, index: usize, total: usize, id: &str, error: &str) {
        let _ = (index, total, id, error);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total_documents: usize, reviewed: usize) {
        let _ = (total_documents, reviewed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReviewProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ReviewConfig`].
pub type ProgressCallback = Arc<dyn ReviewProgressCallback>;
