use thiserror::Error;

/// Failure of a single extraction call. The batch loop counts these and moves on.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("protocol error executing HTTP request to {url}")]
    Protocol {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("transport error executing HTTP request to {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode annotation response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("annotation failed: {0}")]
    Failed(String),
}

impl AnnotationError {
    pub fn from_reqwest(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_connect() || source.is_timeout() || source.is_request() || source.is_body() {
            AnnotationError::Transport { url, source }
        } else {
            AnnotationError::Protocol { url, source }
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AnnotationError::Transport { .. })
    }
}
