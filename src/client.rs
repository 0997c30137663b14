use crate::config::RequestConfig;
use crate::error::AnnotationError;
use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Blocking HTTP client with the fixed retry policy used for every annotation call.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    retry_attempts: u8,
    retry_backoff: Duration,
}

impl HttpClient {
    pub fn new(config: &RequestConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (k, v) in &config.headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .with_context(|| format!("invalid header name {k}"))?;
            let value =
                HeaderValue::from_str(v).with_context(|| format!("invalid header value for {k}"))?;
            headers.insert(name, value);
        }

        if let Some(user_agent) = &config.user_agent {
            headers.insert(USER_AGENT, HeaderValue::from_str(user_agent)?);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            client,
            retry_attempts: config.retry_attempts,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Executes the request produced by `build` and returns the response body.
    ///
    /// Only failures to reach the server are retried; once a request has been
    /// sent it is never replayed. A non-200 status is logged and the body is
    /// still handed back to the caller.
    pub fn request<F>(&self, build: F) -> Result<String, AnnotationError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let retries = u32::from(self.retry_attempts);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let request = match build(&self.client).build() {
                Ok(request) => request,
                Err(err) => {
                    let url = err
                        .url()
                        .map(|u| u.to_string())
                        .unwrap_or_else(|| "<unbuilt request>".to_string());
                    let err = AnnotationError::from_reqwest(url.as_str(), err);
                    error!(
                        %url,
                        attempt,
                        error = %err,
                        "fatal protocol violation building request"
                    );
                    return Err(err);
                }
            };
            let url = request.url().to_string();

            match self.client.execute(request) {
                Ok(resp) => {
                    let status = resp.status();
                    if status != StatusCode::OK {
                        error!(%url, %status, "method failed");
                    }
                    let body = resp.bytes().map_err(|err| {
                        error!(%url, error = %err, "fatal transport error reading response body");
                        AnnotationError::from_reqwest(url.as_str(), err)
                    })?;
                    debug!(%url, bytes = body.len(), attempt, "response received");
                    return Ok(String::from_utf8_lossy(&body).into_owned());
                }
                Err(err) if err.is_connect() && attempt <= retries => {
                    warn!(%url, attempt, error = %err, "connection failed; retrying");
                    std::thread::sleep(self.retry_backoff);
                }
                Err(err) => {
                    let err = AnnotationError::from_reqwest(url.as_str(), err);
                    if err.is_transport() {
                        error!(%url, attempt, error = %err, "fatal transport error");
                    } else {
                        error!(%url, attempt, error = %err, "fatal protocol violation");
                    }
                    return Err(err);
                }
            }
        }
    }
}
