//! Export: aggregated review → JSON bytes.
//!
//! Output is reproducible byte for byte: keys are written in lexicographic
//! order at every level, indentation is four spaces, and the document ends
//! with a single newline.
//!
//! ```text
//! {
//!     "paper-a.pdf": {
//!         "Abstract": "…",
//!         "Methods": "…",
//!         "Results": "…"
//!     }
//! }
//! ```

use crate::error::SerializationError;
use crate::output::AggregatedReview;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Serializer;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Which part of the aggregate is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportLayout {
    /// One key per document identifier, each mapping section labels to summaries.
    #[default]
    Documents,
    /// One key per section label, mapping to the cross-document concatenation.
    Consolidated,
}

impl FromStr for ExportLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "documents" | "per-document" => Ok(ExportLayout::Documents),
            "consolidated" | "merged" => Ok(ExportLayout::Consolidated),
            other => Err(format!(
                "unknown layout '{other}' (expected documents or consolidated)"
            )),
        }
    }
}

/// Serialise `review` in the default per-document layout.
pub fn to_json(review: &AggregatedReview) -> Result<Vec<u8>, SerializationError> {
    to_json_with_layout(review, ExportLayout::Documents)
}

/// Serialise `review` in the given layout.
///
/// Fails with [`SerializationError::DuplicateDocument`] when two documents
/// share an identifier; nothing is produced in that case.
pub fn to_json_with_layout(
    review: &AggregatedReview,
    layout: ExportLayout,
) -> Result<Vec<u8>, SerializationError> {
    match layout {
        ExportLayout::Documents => {
            let mut docs: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
            for doc in &review.documents {
                let sections = doc
                    .sections
                    .values()
                    .map(|s| (s.section.label(), s.text.as_str()))
                    .collect();
                if docs.insert(doc.id.as_str(), sections).is_some() {
                    return Err(SerializationError::DuplicateDocument {
                        document: doc.id.clone(),
                    });
                }
            }
            write_pretty(&docs)
        }
        ExportLayout::Consolidated => {
            let merged: BTreeMap<&str, &str> = review
                .consolidated
                .iter()
                .map(|(section, text)| (section.label(), text.as_str()))
                .collect();
            write_pretty(&merged)
        }
    }
}

/// Re-serialise a parsed export with the same formatting.
///
/// `to_json_value(&serde_json::from_slice(&to_json(r)?)?)` reproduces the
/// original bytes.
pub fn to_json_value(value: &serde_json::Value) -> Result<Vec<u8>, SerializationError> {
    write_pretty(value)
}

fn write_pretty<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, SerializationError> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{DocumentReview, SectionSummary};
    use crate::pipeline::aggregate::aggregate;
    use crate::section::Section;

    fn review(id: &str, texts: [&str; 3]) -> DocumentReview {
        DocumentReview {
            id: id.to_string(),
            sections: Section::CORE
                .iter()
                .zip(texts)
                .map(|(&section, text)| {
                    (
                        section,
                        SectionSummary {
                            section,
                            text: text.to_string(),
                            chunks_used: 1,
                            chunks_failed: 0,
                        },
                    )
                })
                .collect(),
            chunk_count: 1,
        }
    }

    #[test]
    fn exact_bytes() {
        let agg = aggregate(vec![review("b.pdf", ["Ab", "Me", "Re"]), review("a.pdf", ["X", "", ""])]);
        let json = String::from_utf8(to_json(&agg).unwrap()).unwrap();
        let expected = r#"{
    "a.pdf": {
        "Abstract": "X",
        "Methods": "",
        "Results": ""
    },
    "b.pdf": {
        "Abstract": "Ab",
        "Methods": "Me",
        "Results": "Re"
    }
}
"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn parses_back_with_both_ids_and_schema() {
        let agg = aggregate(vec![review("docA", ["a", "b", "c"]), review("docB", ["d", "e", "f"])]);
        let value: serde_json::Value = serde_json::from_slice(&to_json(&agg).unwrap()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.keys().collect::<Vec<_>>(), ["docA", "docB"]);
        for doc in obj.values() {
            let keys: Vec<&String> = doc.as_object().unwrap().keys().collect();
            assert_eq!(keys, ["Abstract", "Methods", "Results"]);
        }
        assert_eq!(value["docB"]["Methods"], "e");
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let agg = aggregate(vec![
            review("zz \"quoted\".pdf", ["ünïcode — text", "tab\there", "new\nline"]),
            review("00.pdf", ["", "", ""]),
        ]);
        let bytes = to_json(&agg).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(to_json_value(&value).unwrap(), bytes);
    }

    #[test]
    fn empty_aggregate_is_empty_object() {
        let bytes = to_json(&AggregatedReview::default()).unwrap();
        assert_eq!(bytes, b"{}\n");
    }

    #[test]
    fn duplicate_ids_fail() {
        let agg = aggregate(vec![review("same.pdf", ["a", "", ""]), review("same.pdf", ["b", "", ""])]);
        let err = to_json(&agg).unwrap_err();
        assert!(matches!(
            err,
            SerializationError::DuplicateDocument { ref document } if document == "same.pdf"
        ));
    }

    #[test]
    fn consolidated_layout() {
        let agg = aggregate(vec![review("a.pdf", ["One.", "", "R1."]), review("b.pdf", ["Two.", "", "R2."])]);
        let json = String::from_utf8(to_json_with_layout(&agg, ExportLayout::Consolidated).unwrap()).unwrap();
        let expected = r#"{
    "Abstract": "One. Two.",
    "Methods": "",
    "Results": "R1. R2."
}
"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn extended_labels_sort_lexicographically() {
        let mut doc = review("a.pdf", ["", "", ""]);
        doc.sections.insert(Section::ResearchQuestion, SectionSummary::empty(Section::ResearchQuestion));
        doc.sections.insert(Section::DataSynthesis, SectionSummary::empty(Section::DataSynthesis));
        let value: serde_json::Value = serde_json::from_slice(&to_json(&aggregate(vec![doc])).unwrap()).unwrap();
        let keys: Vec<&String> = value["a.pdf"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["Abstract", "Data Synthesis", "Methods", "Research Question", "Results"]);
    }

    #[test]
    fn layout_parse() {
        assert_eq!("consolidated".parse::<ExportLayout>().unwrap(), ExportLayout::Consolidated);
        assert_eq!("Documents".parse::<ExportLayout>().unwrap(), ExportLayout::Documents);
        assert!("csv".parse::<ExportLayout>().is_err());
    }
}
