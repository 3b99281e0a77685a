//! Error types for chart store access
//!
//! Every variant names the request it came from so a per-chart failure in
//! the run report can be traced back without extra context.

/// Chart store failure
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// HTTP client could not be built
    #[error("http client error: {0}")]
    Client(#[source] reqwest::Error),

    /// API key cannot be sent as a header value
    #[error("api key contains characters not allowed in a header")]
    InvalidApiKey,

    /// Request never produced a response
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// Response envelope reported an error
    #[error("{url} returned an error: {message}")]
    Envelope { url: String, message: String },

    /// Response body did not match the expected shape
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Space or chart does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Store refused the operation
    #[error("store rejected request: {0}")]
    Rejected(String),
}

impl StoreError {
    /// Create decode error for a resource
    pub fn decode(url: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Whether retrying the same request could succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let err = StoreError::Status {
            url: "http://localhost/api/v1/saved/abc".to_string(),
            status: 403,
            body: "forbidden".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("403"));
        assert!(text.contains("saved/abc"));
    }

    #[test]
    fn retryable_classification() {
        let server = StoreError::Status {
            url: String::new(),
            status: 503,
            body: String::new(),
        };
        let client = StoreError::Status {
            url: String::new(),
            status: 400,
            body: String::new(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!StoreError::NotFound("x".to_string()).is_retryable());
    }
}
