//! Aggregation: per-document reviews → one batch-level review.
//!
//! A pure fold. Documents keep their input order and stay distinct; the only
//! cross-document field is the per-section concatenation in
//! [`AggregatedReview::consolidated`].

use crate::output::{AggregatedReview, DocumentReview};
use crate::section::Section;
use std::collections::BTreeMap;

/// Combine `reviews` into an [`AggregatedReview`].
///
/// Empty input gives an aggregate with no documents and nothing consolidated.
pub fn aggregate(reviews: Vec<DocumentReview>) -> AggregatedReview {
    let mut consolidated: BTreeMap<Section, String> = BTreeMap::new();

    for review in &reviews {
        for (&section, summary) in &review.sections {
            let merged = consolidated.entry(section).or_default();
            if summary.text.is_empty() {
                continue;
            }
            if !merged.is_empty() {
                merged.push(' ');
            }
            merged.push_str(&summary.text);
        }
    }

    AggregatedReview {
        documents: reviews,
        consolidated,
    }
}
