use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub uri: String,
    #[serde(default)]
    pub support: Option<u64>,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub surface_form: Option<String>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub similarity_score: Option<f64>,
    #[serde(default)]
    pub percentage_of_second_rank: Option<f64>,
}

impl Resource {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            support: None,
            types: Vec::new(),
            surface_form: None,
            offset: None,
            similarity_score: None,
            percentage_of_second_rank: None,
        }
    }
}

/// Snippet handed to an annotator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Text(String);

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Collapses every whitespace run (tabs and newlines included) into a single space.
    pub fn normalized(raw: &str) -> Self {
        static WHITESPACE: OnceLock<Regex> = OnceLock::new();
        let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex must compile"));
        Self(re.replace_all(raw, " ").into_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_sha256: String,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub total_extraction_nanos: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl BatchReport {
    pub fn new(input: PathBuf, output: PathBuf, input_sha256: String) -> Self {
        Self {
            input,
            output,
            input_sha256,
            processed: 0,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            total_extraction_nanos: 0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Mean time of the successful extractions, in milliseconds.
    pub fn average_extraction_ms(&self) -> Option<f64> {
        if self.succeeded == 0 {
            return None;
        }
        let nanos = self.total_extraction_nanos as f64 / self.succeeded as f64;
        Some(nanos / 1_000_000.0)
    }
}
