use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pdx_deid::config::ProcessingConfig;
use pdx_deid::{
    ClassificationError, Error, ExtractionError, Pipeline, PiiClassifier, RgbColor, RuleClassifier, SpanExtractor,
};

use crate::fixtures::{Line, TestFixtures};

fn never(_: &str) -> Result<bool, ClassificationError> {
    Ok(false)
}

fn sequential_config() -> ProcessingConfig {
    let mut config = ProcessingConfig::default();
    config.redaction.parallel = false;
    config
}

fn extract(bytes: &[u8]) -> Vec<pdx_deid::TextSpan> {
    SpanExtractor::default().extract(bytes).unwrap()
}

#[test]
fn test_form_is_redacted_in_place() {
    let source = TestFixtures::form(&[
        "Patient Record",
        "Name - John Smith",
        "Email - jane@example.com",
        "Phone - 555-123-4567",
    ]);
    let classifier = RuleClassifier::from_config(&ProcessingConfig::default().classifier)
        .unwrap()
        .with_lexicon_words(["john"]);
    let pipeline = Pipeline::new(ProcessingConfig::default(), Arc::new(classifier)).unwrap();

    let outcome = pipeline.process("record-1", &source).unwrap();
    let before = extract(&source);
    let after = extract(&outcome.document);

    assert_eq!(
        TestFixtures::texts(&after),
        vec![
            "Patient Record",
            "Name - [REDACTED] Smith",
            "Email - [REDACTED]",
            "Phone - [REDACTED]",
        ]
    );
    for (original, redacted) in before.iter().zip(&after) {
        assert_eq!(original.bbox.x0, redacted.bbox.x0);
        assert_eq!(original.bbox.y0, redacted.bbox.y0);
        assert_eq!(original.font_name, redacted.font_name);
        assert_eq!(original.font_size, redacted.font_size);
    }

    let report = &outcome.report;
    assert_eq!(report.document_id, "record-1");
    assert_eq!(report.classifier, "rules");
    assert_eq!(report.source_pages, 1);
    assert_eq!(report.output_pages, 1);
    assert_eq!(report.redaction.spans, 4);
    assert_eq!(report.redaction.fields, 3);
    assert_eq!(report.redaction.tokens_classified, 4);
    assert_eq!(report.redaction.tokens_redacted, 3);
    assert_eq!(report.output_bytes, outcome.document.len());
}

#[test]
fn test_non_pii_pass_through_is_idempotent() {
    let source = TestFixtures::form(&["Confidential Notice", "Name - Jane Doe", "Ward - 7B"]);
    let pipeline = Pipeline::new(sequential_config(), Arc::new(never)).unwrap();

    let first = pipeline.process("pass-1", &source).unwrap();
    let second = pipeline.process("pass-2", &first.document).unwrap();

    assert_eq!(TestFixtures::texts(&extract(&source)), TestFixtures::texts(&extract(&first.document)));
    assert_eq!(first.document, second.document);
    assert_eq!(first.report.redaction.tokens_redacted, 0);
}

#[test]
fn test_unlabeled_text_never_reaches_classifier() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let classifier = move |_: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<bool, ClassificationError>(true)
    };
    let source = TestFixtures::form(&["Discharge Summary", "Smith-Jones", "Page 1 of 1"]);
    let pipeline = Pipeline::new(ProcessingConfig::default(), Arc::new(classifier)).unwrap();

    let outcome = pipeline.process("unlabeled", &source).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        TestFixtures::texts(&extract(&outcome.document)),
        vec!["Discharge Summary", "Smith-Jones", "Page 1 of 1"]
    );
}

#[test]
fn test_classifier_failure_is_atomic() {
    let lines: Vec<String> = (1..=10).map(|i| format!("Field {} - value{}", i, i)).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let source = TestFixtures::form(&refs);

    let failing = |token: &str| {
        if token == "value5" {
            Err(ClassificationError::Fault {
                token: token.to_string(),
                reason: "inference failed".into(),
            })
        } else {
            Ok(false)
        }
    };

    for parallel in [false, true] {
        let mut config = ProcessingConfig::default();
        config.redaction.parallel = parallel;
        let pipeline = Pipeline::new(config, Arc::new(failing)).unwrap();

        let err = pipeline.process("atomic", &source).unwrap_err();
        assert!(matches!(err, Error::Classification(ClassificationError::Fault { .. })));
        assert_eq!(pipeline.metrics().get_counter("documents_processed"), 0);
        assert_eq!(pipeline.metrics().get_counter("failures.classification"), 1);
    }
}

#[test]
fn test_pages_and_colors_survive() {
    let source = TestFixtures::pdf(&[
        vec![Line::new("Name - John", 72.0, 700.0).rgb(0.0, 0.0, 1.0)],
        vec![
            Line::new("Heading", 100.0, 750.0).font("F2", 18.0),
            Line::new("MRN - 0042", 100.0, 600.0).font("F3", 10.0),
        ],
        vec![Line::new("Footer", 72.0, 40.0)],
    ]);
    let classifier = |token: &str| Ok::<bool, ClassificationError>(token == "John" || token == "0042");
    let pipeline = Pipeline::new(ProcessingConfig::default(), Arc::new(classifier)).unwrap();

    let outcome = pipeline.process("multi", &source).unwrap();
    let spans = extract(&outcome.document);

    assert_eq!(outcome.report.output_pages, 3);
    let pages: Vec<u32> = spans.iter().map(|s| s.page_index).collect();
    assert_eq!(pages, vec![0, 1, 1, 2]);

    assert_eq!(spans[0].text, "Name - [REDACTED]");
    assert_eq!(spans[0].color, RgbColor::new(0.0, 0.0, 1.0));
    assert_eq!(spans[1].font_name, "Times-Bold");
    assert_eq!(spans[1].font_size, 18.0);
    assert_eq!(spans[2].text, "MRN - [REDACTED]");
    assert_eq!(spans[2].font_name, "Courier");
    assert_eq!(spans[3].color, RgbColor::BLACK);
}

#[test]
fn test_parallel_output_matches_sequential() {
    let lines: Vec<String> = (0..30).map(|i| format!("Line {} - id{} Smith", i, i)).collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let source = TestFixtures::form(&refs);
    let classifier: Arc<dyn PiiClassifier> =
        Arc::new(|token: &str| Ok::<bool, ClassificationError>(token.starts_with("id")));

    let mut parallel = ProcessingConfig::default();
    parallel.redaction.worker_threads = Some(4);
    let a = Pipeline::new(sequential_config(), Arc::clone(&classifier)).unwrap();
    let b = Pipeline::new(parallel, classifier).unwrap();

    let sequential = a.process("seq", &source).unwrap();
    let concurrent = b.process("par", &source).unwrap();
    assert_eq!(sequential.document, concurrent.document);
    assert_eq!(sequential.report.redaction, concurrent.report.redaction);
}

#[test]
fn test_blank_source_yields_blank_page() {
    let pipeline = Pipeline::new(ProcessingConfig::default(), Arc::new(never)).unwrap();
    let outcome = pipeline.process("blank", &TestFixtures::blank()).unwrap();
    assert_eq!(outcome.report.redaction.spans, 0);
    assert_eq!(outcome.report.output_pages, 1);
    assert!(extract(&outcome.document).is_empty());
}

#[test]
fn test_undecodable_page_fails_instead_of_blanking() {
    let pipeline = Pipeline::new(ProcessingConfig::default(), Arc::new(never)).unwrap();
    let sources = [
        TestFixtures::encoded_page("FlateDecode", b"Name - John Smith".to_vec()),
        TestFixtures::encoded_page("LZWDecode", vec![0x80, 0x0B, 0x60, 0x50, 0x22]),
    ];

    for source in &sources {
        let err = pipeline.process("encoded", source).unwrap_err();
        assert!(matches!(err, Error::Extraction(ExtractionError::ContentStream { page: 1, .. })));
    }
    assert_eq!(pipeline.metrics().get_counter("failures.extraction"), 2);
    assert_eq!(pipeline.metrics().get_counter("documents_processed"), 0);
}

#[test]
fn test_garbage_input_is_extraction_error() {
    let pipeline = Pipeline::new(ProcessingConfig::default(), Arc::new(never)).unwrap();
    let err = pipeline.process("garbage", b"%PDF-1.4 truncated").unwrap_err();
    assert_eq!(err.kind(), "extraction");
}

#[tokio::test]
async fn test_concurrent_documents() {
    let pipeline = Pipeline::new(
        ProcessingConfig::default(),
        Arc::new(|token: &str| Ok::<bool, ClassificationError>(token == "John")),
    )
    .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = pipeline.clone();
            let source = TestFixtures::form(&["Name - John Smith", &format!("Visit - {}", i)]);
            tokio::spawn(async move { pipeline.process_async(format!("doc-{}", i), source).await })
        })
        .collect();

    let mut record_ids = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(extract(&outcome.document)[0].text, "Name - [REDACTED] Smith");
        record_ids.push(outcome.report.record_id);
    }
    record_ids.sort();
    record_ids.dedup();
    assert_eq!(record_ids.len(), 4);
    assert_eq!(pipeline.metrics().get_counter("documents_processed"), 4);
}
