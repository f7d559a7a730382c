//! Pipeline stages for turning research PDFs into a systematic review.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the two external capabilities (PDF parsing and text
//! generation) can be swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ normalize ──▶ chunk ──▶ summarize ──▶ aggregate ──▶ export
//! (pdfium)    (cleanup)    (bounded)  (LLM/section)  (batch fold)   (JSON)
//! ```
//!
//! 1. [`extract`]   : PDF bytes to plain text; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 2. [`normalize`] : deterministic, idempotent whitespace and glyph cleanup
//! 3. [`chunk`]     : split into slices that fit the model's input limit
//! 4. [`summarize`] : one prompt per (section, chunk); the only stage with
//!    network I/O
//! 5. [`aggregate`] : fold per-document reviews into the batch review
//! 6. [`export`]    : reproducible JSON with sorted keys

pub mod aggregate;
pub mod chunk;
pub mod export;
pub mod extract;
pub mod normalize;
pub mod summarize;
