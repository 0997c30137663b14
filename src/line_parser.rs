use serde::Deserialize;
use thiserror::Error;

/// Column holding the annotation text in occurrence TSV dumps.
const OCC_TEXT_FIELD: usize = 3;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LineParseError {
    #[error("expected tab-separated field {index}, row has {found} field(s)")]
    MissingField { index: usize, found: usize },
}

/// Strategy for deriving the snippet to annotate from one raw corpus line.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LineParser {
    /// One snippet per line, surrounding whitespace trimmed.
    #[default]
    Manual,
    /// Occurrence TSV rows, text taken from the fourth column.
    OccTsv,
}

impl LineParser {
    pub fn parse(&self, line: &str) -> Result<String, LineParseError> {
        match self {
            LineParser::Manual => Ok(line.trim().to_string()),
            LineParser::OccTsv => {
                let fields: Vec<&str> = line.trim().split('\t').collect();
                fields
                    .get(OCC_TEXT_FIELD)
                    .map(|field| field.to_string())
                    .ok_or(LineParseError::MissingField {
                        index: OCC_TEXT_FIELD,
                        found: fields.len(),
                    })
            }
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            LineParser::Manual => "manual",
            LineParser::OccTsv => "occ_tsv",
        }
    }
}
