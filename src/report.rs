use crate::model::BatchReport;
use anyhow::{Context, Result, bail};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub fn load_report(path: &Path) -> Result<BatchReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read batch report {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse batch report {}", path.display()))
}

pub fn write_report(path: &Path, report: &BatchReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create report dir {}", parent.display()))?;
    }

    let serialized = serde_json::to_string_pretty(report)?;
    std::fs::write(path, serialized)
        .with_context(|| format!("failed to write batch report {}", path.display()))
}

/// Guards a restarted run: the corpus must hash to the digest recorded by the
/// run being resumed, otherwise item numbering no longer lines up.
///
/// Returns `None` when no earlier report exists at `previous`.
pub fn verify_restart_input(previous: &Path, input: &Path) -> Result<Option<BatchReport>> {
    if !previous.exists() {
        info!(report = %previous.display(), "no earlier report; restart not verified");
        return Ok(None);
    }

    let earlier = load_report(previous)?;
    let bytes = std::fs::read(input)
        .with_context(|| format!("failed to read input file {}", input.display()))?;
    let digest = sha256_hex(&bytes);
    if digest != earlier.input_sha256 {
        bail!(
            "input {} does not match the corpus recorded in {} (sha256 {} vs {})",
            input.display(),
            previous.display(),
            digest,
            earlier.input_sha256
        );
    }

    info!(
        report = %previous.display(),
        processed = earlier.processed,
        "restart input matches earlier run"
    );
    Ok(Some(earlier))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
