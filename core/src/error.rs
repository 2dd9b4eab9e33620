use serde_json::Value;
use thiserror::Error;

/// Failure raised by the NetBox REST client.
///
/// `RequestFailure` is the only variant that carries an upstream response;
/// everything else means the call never produced a usable answer.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid NetBox base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("API token contains characters that are not valid in an HTTP header")]
    InvalidToken,

    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// Non-2xx answer from NetBox. `body` is the raw response text.
    #[error("{status} error for {method} {url}: {body}")]
    RequestFailure {
        status: u16,
        method: String,
        url: String,
        body: String,
    },

    #[error("failed to reach NetBox at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("NetBox returned a body that is not valid JSON for {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientError {
    /// HTTP status of the upstream answer, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::RequestFailure { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed response body of a failed request. `None` when the failure has
    /// no body or the body is not JSON.
    pub fn structured_body(&self) -> Option<Value> {
        match self {
            ClientError::RequestFailure { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }

    /// Text used when a failure is re-described for a caller: the structured
    /// body if there is one, otherwise this error's own message.
    pub fn detail(&self) -> String {
        self.structured_body()
            .map(|body| body.to_string())
            .unwrap_or_else(|| self.to_string())
    }
}
