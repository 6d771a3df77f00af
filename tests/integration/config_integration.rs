use std::io::Write;
use std::sync::Arc;

use pdx_deid::config::{PageSize, ProcessingConfig};
use pdx_deid::{Pipeline, RuleClassifier, SpanExtractor};
use tempfile::NamedTempFile;

use crate::fixtures::TestFixtures;

fn write_temp(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_yaml_config_with_lexicon_file() {
    let lexicon = write_temp("# surnames\nSmith\n");
    let config_file = write_temp(&format!(
        "classifier:\n  rules: [ssn]\n  lexicon_path: {:?}\ncomposition:\n  page_size: a4\n",
        lexicon.path().display().to_string()
    ));

    let config = ProcessingConfig::from_file(config_file.path()).unwrap();
    assert_eq!(config.composition.page_size, PageSize::A4);

    let classifier = RuleClassifier::from_config(&config.classifier).unwrap();
    let pipeline = Pipeline::new(config, Arc::new(classifier)).unwrap();

    let source = TestFixtures::form(&["Name - John Smith", "SSN - 123-45-6789"]);
    let outcome = pipeline.process("yaml", &source).unwrap();
    let spans = SpanExtractor::default().extract(&outcome.document).unwrap();
    assert_eq!(
        TestFixtures::texts(&spans),
        vec!["Name - John [REDACTED]", "SSN - [REDACTED]"]
    );
}

#[test]
fn test_json_config_is_validated() {
    let config_file = write_temp(r#"{"composition": {"default_font": "Papyrus"}}"#);
    let err = ProcessingConfig::from_file(config_file.path()).unwrap_err();
    assert_eq!(err.kind(), "config");
}

#[test]
fn test_missing_config_file() {
    let err = ProcessingConfig::from_file("/nonexistent/pdx-deid.yaml").unwrap_err();
    assert_eq!(err.kind(), "config");
}
