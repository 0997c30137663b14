use crate::line_parser::LineParser;
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AnnotatorConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub request: RequestConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl AnnotatorConfig {
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.service.endpoint.trim();
        if endpoint.is_empty() {
            bail!("service.endpoint must not be empty");
        }
        let url = Url::parse(endpoint)
            .with_context(|| format!("service.endpoint is not a valid url: {endpoint}"))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            bail!("service.endpoint must use http or https, got {}", url.scheme());
        }

        match self.service.method.to_ascii_uppercase().as_str() {
            "GET" | "POST" => {}
            other => bail!("service.method must be GET or POST, got {other}"),
        }

        if !(0.0..=1.0).contains(&self.service.confidence) {
            bail!(
                "service.confidence must be within [0, 1], got {}",
                self.service.confidence
            );
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_get")]
    pub method: String,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default = "default_support")]
    pub support: u32,
    #[serde(default)]
    pub types: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            method: default_get(),
            confidence: default_confidence(),
            support: default_support(),
            types: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts made when the connection could not be established.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u8,
    #[serde(default)]
    pub retry_backoff_ms: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: 0,
            user_agent: None,
            headers: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BatchConfig {
    #[serde(default)]
    pub parser: LineParser,
    #[serde(default)]
    pub restart_from: usize,
}

pub fn load_config(config_path: &Path) -> Result<AnnotatorConfig> {
    let text = std::fs::read_to_string(config_path)
        .with_context(|| format!("failed to read config: {}", config_path.display()))?;
    let config: AnnotatorConfig = toml::from_str(&text)
        .with_context(|| format!("failed to parse toml in {}", config_path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    Ok(config)
}

/// Loads `path` when given, otherwise falls back to the built-in defaults.
pub fn load_config_or_default(config_path: Option<&Path>) -> Result<AnnotatorConfig> {
    match config_path {
        Some(path) => load_config(path),
        None => Ok(AnnotatorConfig::default()),
    }
}

fn default_endpoint() -> String {
    "http://localhost:2222/rest/annotate".to_string()
}

fn default_get() -> String {
    "GET".to_string()
}

fn default_confidence() -> f64 {
    0.2
}

fn default_support() -> u32 {
    20
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_attempts() -> u8 {
    3
}
