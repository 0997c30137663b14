use crate::client::HttpClient;
use crate::config::{AnnotatorConfig, ServiceConfig};
use crate::error::AnnotationError;
use crate::model::{Resource, Text};
use anyhow::Result;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::debug;

/// Maps free text to the entities it references.
pub trait Annotator {
    fn name(&self) -> &str;
    fn extract(&self, text: &Text) -> Result<Vec<Resource>, AnnotationError>;
}

/// Annotator backed by a DBpedia Spotlight `annotate` endpoint.
pub struct SpotlightAnnotator {
    client: HttpClient,
    service: ServiceConfig,
}

impl SpotlightAnnotator {
    pub fn new(config: &AnnotatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            client: HttpClient::new(&config.request)?,
            service: config.service.clone(),
        })
    }

    fn params(&self, text: &Text) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("text", text.as_str().to_string()),
            ("confidence", self.service.confidence.to_string()),
            ("support", self.service.support.to_string()),
        ];
        if let Some(types) = self.service.types.as_ref().filter(|t| !t.trim().is_empty()) {
            params.push(("types", types.clone()));
        }
        params
    }
}

impl Annotator for SpotlightAnnotator {
    fn name(&self) -> &str {
        "spotlight"
    }

    fn extract(&self, text: &Text) -> Result<Vec<Resource>, AnnotationError> {
        let params = self.params(text);
        let endpoint = self.service.endpoint.as_str();
        let post = self.service.method.eq_ignore_ascii_case("POST");

        let body = self.client.request(|client| {
            let request = if post {
                client.post(endpoint).form(&params)
            } else {
                client.get(endpoint).query(&params)
            };
            request.header(ACCEPT, "application/json")
        })?;

        let resources = parse_annotate_response(&body)?;
        debug!(
            endpoint,
            chars = text.as_str().len(),
            resources = resources.len(),
            "spotlight annotation parsed"
        );
        Ok(resources)
    }
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(rename = "Resources", default)]
    resources: Option<OneOrMany<SpotlightResource>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

#[derive(Debug, Deserialize)]
struct SpotlightResource {
    #[serde(rename = "@URI")]
    uri: String,
    #[serde(rename = "@support", default)]
    support: Option<String>,
    #[serde(rename = "@types", default)]
    types: Option<String>,
    #[serde(rename = "@surfaceForm", default)]
    surface_form: Option<String>,
    #[serde(rename = "@offset", default)]
    offset: Option<String>,
    #[serde(rename = "@similarityScore", default)]
    similarity_score: Option<String>,
    #[serde(rename = "@percentageOfSecondRank", default)]
    percentage_of_second_rank: Option<String>,
}

impl From<SpotlightResource> for Resource {
    fn from(raw: SpotlightResource) -> Self {
        Resource {
            uri: raw.uri,
            support: raw.support.and_then(|v| v.trim().parse().ok()),
            types: raw
                .types
                .map(|t| {
                    t.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            surface_form: raw.surface_form,
            offset: raw.offset.and_then(|v| v.trim().parse().ok()),
            similarity_score: raw.similarity_score.and_then(|v| v.trim().parse().ok()),
            percentage_of_second_rank: raw
                .percentage_of_second_rank
                .and_then(|v| v.trim().parse().ok()),
        }
    }
}

/// Extracts the resources from a Spotlight JSON body. A body without
/// `Resources` means nothing was spotted.
pub fn parse_annotate_response(body: &str) -> Result<Vec<Resource>, AnnotationError> {
    let response: AnnotateResponse = serde_json::from_str(body)?;
    let resources = match response.resources {
        None => Vec::new(),
        Some(OneOrMany::One(resource)) => vec![resource.into()],
        Some(OneOrMany::Many(resources)) => resources.into_iter().map(Resource::from).collect(),
    };
    Ok(resources)
}
