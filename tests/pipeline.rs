//! Integration tests for the review pipeline with deterministic stub
//! capabilities. No pdfium library or API key is needed.
//!
//! Run with:
//!   cargo test --test pipeline

use edgequake_sysreview::{
    aggregate, build_review, extract_fn, review, review_documents, summarize_fn, to_json,
    to_json_value, write_atomic, ExtractionError, IssueKind, RawDocument, ReviewConfig,
    ReviewError, ReviewProgressCallback, Section, SerializationError, SummarizeError,
};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Treats the payload as UTF-8 text; payloads starting with `CORRUPT` fail.
fn stub_extractor() -> impl edgequake_sysreview::ExtractText {
    extract_fn(|doc: &RawDocument| {
        if doc.bytes().starts_with(b"CORRUPT") {
            Err(ExtractionError::Corrupt {
                document: doc.id().to_string(),
                detail: "trailer not found".into(),
            })
        } else {
            Ok(String::from_utf8_lossy(doc.bytes()).into_owned())
        }
    })
}

/// Instruction line of a section prompt.
fn instruction(prompt: &str) -> &str {
    prompt.lines().next().unwrap_or_default()
}

/// Chunk body of a section prompt.
fn body(prompt: &str) -> &str {
    prompt.split_once('\n').map(|(_, b)| b).unwrap_or_default()
}

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl ReviewProgressCallback for RecordingCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.events.lock().unwrap().push(format!("batch {total_documents}"));
    }
    fn on_document_start(&self, index: usize, _total: usize, id: &str) {
        self.events.lock().unwrap().push(format!("start {index} {id}"));
    }
    fn on_document_complete(&self, index: usize, _total: usize, id: &str, warnings: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {index} {id} {warnings}"));
    }
    fn on_document_error(&self, index: usize, _total: usize, id: &str, _error: &str) {
        self.events.lock().unwrap().push(format!("error {index} {id}"));
    }
    fn on_batch_complete(&self, total_documents: usize, reviewed: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete {total_documents} {reviewed}"));
    }
}

// ── End-to-end with stubs ────────────────────────────────────────────────────

#[tokio::test]
async fn failed_extraction_is_excluded_and_reported() {
    let abstract_instruction = edgequake_sysreview::prompts::section_instruction(Section::Abstract);
    let summarizer = summarize_fn(move |prompt: &str| {
        if instruction(prompt) == abstract_instruction {
            Ok("X".to_string())
        } else {
            // Nothing relevant for the other sections.
            Ok(String::new())
        }
    });

    let docs = vec![
        RawDocument::new("broken.pdf", b"CORRUPT".to_vec()),
        RawDocument::new("good.pdf", b"A short paper about statins.".to_vec()),
    ];
    let outcome =
        review_documents(&docs, &stub_extractor(), &summarizer, &ReviewConfig::default()).await;

    assert_eq!(outcome.review.len(), 1);
    let json: serde_json::Value = serde_json::from_slice(&to_json(&outcome.review).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "good.pdf": { "Abstract": "X", "Methods": "", "Results": "" }
        })
    );

    // Empty answers for Methods and Results are not failures.
    assert_eq!(outcome.failed_documents().collect::<Vec<_>>(), ["broken.pdf"]);
    assert_eq!(outcome.issues.len(), 1);
    let issue = &outcome.issues[0];
    assert_eq!(issue.kind, IssueKind::Extraction);
    assert_eq!(issue.document_id, "broken.pdf");
    assert!(issue.message.contains("trailer not found"));
    assert_eq!(outcome.stats.failed_calls, 0);
    assert_eq!(outcome.stats.summarizer_calls, 3);
}

#[tokio::test]
async fn one_failing_chunk_degrades_only_its_section() {
    let summarizer = summarize_fn(|prompt: &str| {
        let chunk = body(prompt);
        if chunk.contains("beta") {
            Err(SummarizeError::Provider("HTTP 429 rate limited".into()))
        } else {
            Ok(format!("<{chunk}>"))
        }
    });
    let config = ReviewConfig::builder()
        .max_chunk_len(5)
        .length_unit(edgequake_sysreview::LengthUnit::Chars)
        .sections([Section::Results])
        .build()
        .unwrap();

    let doc = RawDocument::new("paper.pdf", b"alpha beta gamma".to_vec());
    let outcome = build_review(&doc, &stub_extractor(), &summarizer, &config)
        .await
        .unwrap();

    // chunks: "alpha", " beta", " ", "gamma"; the blank one is never sent
    let results = &outcome.review.sections[&Section::Results];
    assert!(!results.text.is_empty());
    assert_eq!(results.text, "<alpha> <gamma>");
    assert_eq!(results.chunks_failed, 1);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(outcome.warnings[0].section, Section::Results);
    assert_eq!(outcome.warnings[0].chunk, 1);
}

#[tokio::test]
async fn summarization_issues_carry_location() {
    let summarizer = summarize_fn(|_| Err(SummarizeError::Provider("timeout".into())));
    let docs = vec![RawDocument::new("a.pdf", b"text".to_vec())];
    let config = ReviewConfig::builder()
        .sections([Section::Methods])
        .build()
        .unwrap();
    let outcome = review_documents(&docs, &stub_extractor(), &summarizer, &config).await;

    // The document is still reviewed, with an empty section.
    assert_eq!(outcome.review.len(), 1);
    assert_eq!(outcome.review.documents[0].summary(Section::Methods), Some(""));
    assert_eq!(outcome.issues.len(), 1);
    let issue = &outcome.issues[0];
    assert_eq!(issue.kind, IssueKind::Summarization);
    assert_eq!(issue.section, Some(Section::Methods));
    assert_eq!(issue.chunk, Some(0));
}

#[tokio::test]
async fn export_parses_back_with_both_documents() {
    let summarizer = summarize_fn(|prompt: &str| Ok(format!("About: {}", body(prompt))));
    let docs = vec![
        RawDocument::new("docB.pdf", b"Second paper.".to_vec()),
        RawDocument::new("docA.pdf", b"First paper.".to_vec()),
    ];
    let outcome =
        review_documents(&docs, &stub_extractor(), &summarizer, &ReviewConfig::default()).await;

    // Aggregate keeps input order; export sorts keys.
    assert_eq!(outcome.review.ids().collect::<Vec<_>>(), ["docB.pdf", "docA.pdf"]);

    let bytes = to_json(&outcome.review).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let obj = value.as_object().unwrap();
    assert_eq!(obj.len(), 2);
    for id in ["docA.pdf", "docB.pdf"] {
        let sections = obj[id].as_object().unwrap();
        let labels: Vec<&str> = sections.keys().map(String::as_str).collect();
        assert_eq!(labels, ["Abstract", "Methods", "Results"]);
    }
    assert_eq!(value["docA.pdf"]["Results"], "About: First paper.");

    // Byte-identical after a parse/serialise round trip.
    assert_eq!(to_json_value(&value).unwrap(), bytes);
}

#[tokio::test]
async fn duplicate_identifiers_fail_export() {
    let summarizer = summarize_fn(|_| Ok("s".to_string()));
    let docs = vec![
        RawDocument::new("same.pdf", b"one".to_vec()),
        RawDocument::new("same.pdf", b"two".to_vec()),
    ];
    let outcome =
        review_documents(&docs, &stub_extractor(), &summarizer, &ReviewConfig::default()).await;
    assert!(matches!(
        to_json(&outcome.review),
        Err(SerializationError::DuplicateDocument { .. })
    ));
}

#[tokio::test]
async fn progress_events_arrive_in_order() {
    let cb = Arc::new(RecordingCallback::default());
    let config = ReviewConfig::builder()
        .sections([Section::Abstract])
        .progress_callback(cb.clone())
        .build()
        .unwrap();
    let summarizer = summarize_fn(|_| Ok("s".to_string()));
    let docs = vec![
        RawDocument::new("a.pdf", b"text".to_vec()),
        RawDocument::new("b.pdf", b"CORRUPT".to_vec()),
    ];
    review_documents(&docs, &stub_extractor(), &summarizer, &config).await;

    assert_eq!(
        *cb.events.lock().unwrap(),
        vec![
            "batch 2",
            "start 0 a.pdf",
            "done 0 a.pdf 0",
            "start 1 b.pdf",
            "error 1 b.pdf",
            "complete 2 1",
        ]
    );
}

#[tokio::test]
async fn injected_capabilities_are_used_by_review() {
    let config = ReviewConfig::builder()
        .extractor(Arc::new(stub_extractor()))
        .summarizer(Arc::new(summarize_fn(|_| Ok("injected".to_string()))))
        .build()
        .unwrap();
    let docs = vec![RawDocument::new("a.pdf", b"body".to_vec())];
    let outcome = review(&docs, &config).await.unwrap();
    assert_eq!(
        outcome.review.documents[0].summary(Section::Abstract),
        Some("injected")
    );
    assert_eq!(outcome.review.consolidated[&Section::Results], "injected");
}

#[tokio::test]
async fn extended_sections_are_exported() {
    let config = ReviewConfig::builder()
        .sections(Section::ALL)
        .build()
        .unwrap();
    let summarizer = summarize_fn(|_| Ok("s".to_string()));
    let docs = vec![RawDocument::new("a.pdf", b"body".to_vec())];
    let outcome = review_documents(&docs, &stub_extractor(), &summarizer, &config).await;
    let value: serde_json::Value = serde_json::from_slice(&to_json(&outcome.review).unwrap()).unwrap();
    let doc = value["a.pdf"].as_object().unwrap();
    assert_eq!(doc.len(), 9);
    assert!(doc.contains_key("Inclusion Criteria"));
    assert!(doc.contains_key("Search Strategy"));
}

#[test]
fn aggregate_of_nothing_is_empty() {
    let agg = aggregate(Vec::new());
    assert!(agg.is_empty());
    assert_eq!(to_json(&agg).unwrap(), b"{}\n");
}

#[test]
fn export_written_atomically() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("review.json");
    std::fs::write(&path, b"old contents").unwrap();
    write_atomic(&path, b"{}\n").unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"{}\n");
}

#[tokio::test]
async fn missing_input_file_is_fatal() {
    let err = edgequake_sysreview::review_files(&["/no/such/paper.pdf"], &ReviewConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::FileNotFound { .. }));
}

#[test]
fn noop_callback_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<edgequake_sysreview::NoopProgressCallback>();
    assert_send_sync::<ReviewConfig>();
}
