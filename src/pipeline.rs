use crate::annotator::Annotator;
use crate::error::AnnotationError;
use crate::line_parser::{LineParseError, LineParser};
use crate::model::{BatchReport, Resource, Text};
use crate::report::sha256_hex;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub parser: LineParser,
    /// 1-based index of the first item to annotate; earlier items are skipped.
    pub restart_from: usize,
}

/// One corpus line after parsing, as shown by a dry run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedItem {
    pub line_number: usize,
    pub result: Result<String, LineParseError>,
}

pub fn save_extracted_entities<A: Annotator + ?Sized>(
    annotator: &A,
    options: &BatchOptions,
) -> Result<BatchReport> {
    if let Some(parent) = options.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output dir {}", parent.display()))?;
    }
    let file = File::create(&options.output)
        .with_context(|| format!("failed to create output file {}", options.output.display()))?;
    let mut out = BufWriter::new(file);

    info!(input = %display_abs(&options.input), "opening input file");
    let bytes = std::fs::read(&options.input)
        .with_context(|| format!("failed to read input file {}", options.input.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    let mut report = BatchReport::new(
        options.input.clone(),
        options.output.clone(),
        sha256_hex(&bytes),
    );
    let mut index = 0usize;

    for (line_no, line) in text.split('\n').enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed = options.parser.parse(line);
        if matches!(&parsed, Ok(snippet) if snippet.is_empty()) {
            continue;
        }

        index += 1;
        if index < options.restart_from {
            report.skipped += 1;
            continue;
        }
        report.processed += 1;

        let entities = match parsed {
            Ok(snippet) => match timed_extract(annotator, &snippet) {
                Ok((entities, nanos)) => {
                    report.total_extraction_nanos =
                        report.total_extraction_nanos.saturating_add(nanos);
                    report.succeeded += 1;
                    info!(item = index, nanos, "extraction ran");
                    entities
                }
                Err(err) => {
                    report.failed += 1;
                    error!(
                        item = index,
                        annotator = annotator.name(),
                        error = ?err,
                        "extraction failed"
                    );
                    Vec::new()
                }
            },
            Err(err) => {
                report.failed += 1;
                warn!(
                    item = index,
                    line = line_no + 1,
                    parser = options.parser.key(),
                    error = %err,
                    "failed to parse line"
                );
                Vec::new()
            }
        };

        write_entities(&mut out, &entities)
            .with_context(|| format!("failed to write output file {}", options.output.display()))?;
    }

    out.flush()
        .with_context(|| format!("failed to flush output file {}", options.output.display()))?;
    report.finished_at = Some(Utc::now());

    info!(
        items = report.processed,
        successes = report.succeeded,
        errors = report.failed,
        skipped = report.skipped,
        "extracted entities from text items"
    );
    info!(output = %display_abs(&options.output), "results saved");
    match report.average_extraction_ms() {
        Some(avg_ms) => info!(avg_ms, "average extraction time"),
        None => info!("average extraction time unavailable; no successful extractions"),
    }

    Ok(report)
}

pub fn evaluate<A: Annotator + ?Sized>(
    annotator: &A,
    input: &Path,
    output: &Path,
) -> Result<BatchReport> {
    evaluate_manual(annotator, input, output, 0)
}

pub fn evaluate_manual<A: Annotator + ?Sized>(
    annotator: &A,
    input: &Path,
    output: &Path,
    restart_from: usize,
) -> Result<BatchReport> {
    save_extracted_entities(
        annotator,
        &BatchOptions {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            parser: LineParser::Manual,
            restart_from,
        },
    )
}

/// Parses every line of `input` without annotating anything. Blank lines and
/// lines whose parsed value is empty are left out.
pub fn parse_corpus(input: &Path, parser: LineParser) -> Result<Vec<ParsedItem>> {
    let bytes = std::fs::read(input)
        .with_context(|| format!("failed to read input file {}", input.display()))?;
    let text = String::from_utf8_lossy(&bytes);

    let items = text
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(line_no, line)| {
            let result = parser.parse(line);
            if matches!(&result, Ok(parsed) if parsed.is_empty()) {
                return None;
            }
            Some(ParsedItem {
                line_number: line_no + 1,
                result,
            })
        })
        .collect();

    Ok(items)
}

fn timed_extract<A: Annotator + ?Sized>(
    annotator: &A,
    snippet: &str,
) -> Result<(Vec<Resource>, u64), AnnotationError> {
    let text = Text::normalized(snippet);
    let start = Instant::now();
    let entities = annotator.extract(&text)?;
    let nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
    Ok((entities, nanos))
}

fn write_entities<W: Write>(out: &mut W, entities: &[Resource]) -> std::io::Result<()> {
    for entity in entities {
        writeln!(out, "{}", entity.uri)?;
    }
    writeln!(out)?;
    out.flush()
}

fn display_abs(path: &Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
