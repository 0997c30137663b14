use anyhow::Result;
use spotlight_batch::annotator::Annotator;
use spotlight_batch::error::AnnotationError;
use spotlight_batch::line_parser::LineParser;
use spotlight_batch::model::{Resource, Text};
use spotlight_batch::pipeline::{BatchOptions, evaluate, save_extracted_entities};
use spotlight_batch::report::{load_report, sha256_hex, verify_restart_input, write_report};
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Spots every capitalized word and fails on snippets containing `FAIL`.
#[derive(Default)]
struct CapitalizedWords {
    seen: RefCell<Vec<String>>,
}

impl Annotator for CapitalizedWords {
    fn name(&self) -> &str {
        "capitalized-words"
    }

    fn extract(&self, text: &Text) -> Result<Vec<Resource>, AnnotationError> {
        self.seen.borrow_mut().push(text.as_str().to_string());
        if text.as_str().contains("FAIL") {
            return Err(AnnotationError::Failed("service unavailable".to_string()));
        }

        Ok(text
            .as_str()
            .split(' ')
            .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|word| word.chars().next().is_some_and(char::is_uppercase))
            .filter(|word| *word != "The")
            .map(|word| Resource::from_uri(format!("http://dbpedia.org/resource/{word}")))
            .collect())
    }
}

struct AlwaysFails;

impl Annotator for AlwaysFails {
    fn name(&self) -> &str {
        "always-fails"
    }

    fn extract(&self, _text: &Text) -> Result<Vec<Resource>, AnnotationError> {
        Err(AnnotationError::Failed("down".to_string()))
    }
}

#[test]
fn manual_batch_writes_uris_with_blank_separators() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("out/entities.txt");
    let annotator = CapitalizedWords::default();

    let report = evaluate(&annotator, &fixture("corpus.txt"), &output)?;

    assert_eq!(report.processed, 4);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 1);
    assert_eq!(report.skipped, 0);
    assert!(report.finished_at.is_some());

    let content = fs::read_to_string(&output)?;
    assert_eq!(
        content,
        "http://dbpedia.org/resource/Berlin\n\
         http://dbpedia.org/resource/Germany\n\
         \n\
         http://dbpedia.org/resource/Paris\n\
         http://dbpedia.org/resource/France\n\
         \n\
         \n\
         http://dbpedia.org/resource/Tokyo\n\
         http://dbpedia.org/resource/Olympics\n\
         \n"
    );

    let seen = annotator.seen.borrow();
    assert_eq!(seen[1], "Paris in France");

    Ok(())
}

#[test]
fn restart_skips_earlier_items() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("entities.txt");
    let annotator = CapitalizedWords::default();

    let report = save_extracted_entities(
        &annotator,
        &BatchOptions {
            input: fixture("corpus.txt"),
            output: output.clone(),
            parser: LineParser::Manual,
            restart_from: 3,
        },
    )?;

    assert_eq!(report.skipped, 2);
    assert_eq!(report.processed, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(annotator.seen.borrow().len(), 2);

    let content = fs::read_to_string(&output)?;
    assert_eq!(
        content,
        "\nhttp://dbpedia.org/resource/Tokyo\nhttp://dbpedia.org/resource/Olympics\n\n"
    );

    Ok(())
}

#[test]
fn malformed_tsv_rows_are_counted_and_batch_continues() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("occ-entities.txt");
    let annotator = CapitalizedWords::default();

    let report = save_extracted_entities(
        &annotator,
        &BatchOptions {
            input: fixture("occ.tsv"),
            output: output.clone(),
            parser: LineParser::OccTsv,
            restart_from: 0,
        },
    )?;

    assert_eq!(report.processed, 3);
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(
        *annotator.seen.borrow(),
        vec![
            "Berlin is the capital of Germany.".to_string(),
            "Paris lies on the Seine. ".to_string(),
        ]
    );

    assert_eq!(
        fs::read_to_string(&output)?,
        "http://dbpedia.org/resource/Berlin\n\
         http://dbpedia.org/resource/Germany\n\
         \n\
         \n\
         http://dbpedia.org/resource/Paris\n\
         http://dbpedia.org/resource/Seine\n\
         \n"
    );

    Ok(())
}

#[test]
fn average_is_none_without_successes() -> Result<()> {
    let dir = tempdir()?;
    let output = dir.path().join("entities.txt");

    let report = evaluate(&AlwaysFails, &fixture("corpus.txt"), &output)?;

    assert_eq!(report.failed, 4);
    assert_eq!(report.succeeded, 0);
    assert_eq!(report.total_extraction_nanos, 0);
    assert_eq!(report.average_extraction_ms(), None);
    assert_eq!(fs::read_to_string(&output)?, "\n\n\n\n");

    Ok(())
}

#[test]
fn average_uses_successful_extractions_in_millis() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("input.txt");
    fs::write(&input, "Alpha\nBeta\n")?;

    let mut report = evaluate(
        &CapitalizedWords::default(),
        &input,
        &dir.path().join("out.txt"),
    )?;
    assert_eq!(report.succeeded, 2);

    report.total_extraction_nanos = 3_000_000;
    assert_eq!(report.average_extraction_ms(), Some(1.5));

    Ok(())
}

#[test]
fn report_records_input_digest() -> Result<()> {
    let dir = tempdir()?;
    let input = fixture("corpus.txt");
    let report = evaluate(
        &CapitalizedWords::default(),
        &input,
        &dir.path().join("out.txt"),
    )?;

    let report_path = dir.path().join("reports/run.json");
    write_report(&report_path, &report)?;
    let loaded = load_report(&report_path)?;

    assert_eq!(loaded.input_sha256, sha256_hex(&fs::read(&input)?));
    assert_eq!(loaded.processed, report.processed);
    assert_eq!(loaded.failed, report.failed);

    Ok(())
}

#[test]
fn restart_is_checked_against_earlier_corpus() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("corpus.txt");
    fs::copy(fixture("corpus.txt"), &input)?;
    let report_path = dir.path().join("run.json");

    assert!(verify_restart_input(&report_path, &input)?.is_none());

    let report = evaluate(
        &CapitalizedWords::default(),
        &input,
        &dir.path().join("out.txt"),
    )?;
    write_report(&report_path, &report)?;

    let earlier = verify_restart_input(&report_path, &input)?.expect("earlier report exists");
    assert_eq!(earlier.processed, 4);

    fs::write(&input, "A different corpus entirely.
")?;
    let err = verify_restart_input(&report_path, &input).expect_err("corpus changed");
    assert!(err.to_string().contains("does not match"));

    Ok(())
}

#[test]
fn missing_input_is_fatal() {
    let dir = tempdir().expect("tempdir");
    let result = evaluate(
        &CapitalizedWords::default(),
        &dir.path().join("missing.txt"),
        &dir.path().join("out.txt"),
    );
    assert!(result.is_err());
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}
