//! Error types for catalog and engine clients.

/// Failure talking to a dependent HTTP service.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Transport-level failure (connect, timeout, TLS, ...)
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("{url} returned status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body did not decode as the expected shape
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl CatalogError {
    /// HTTP status carried by the error, when the service answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            CatalogError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a retry of the same request could reasonably succeed.
    ///
    /// Only transport failures and 5xx answers qualify; 4xx means the
    /// request itself is wrong.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CatalogError::Transport { .. } => true,
            CatalogError::Status { status, .. } => *status >= 500,
            CatalogError::Decode { .. } => false,
        }
    }

    /// Whether the service rejected the identifier itself (4xx).
    ///
    /// Lookup operations turn these into recoverable messages instead
    /// of raising.
    #[must_use]
    pub fn is_client_rejection(&self) -> bool {
        matches!(self, CatalogError::Status { status, .. } if (400..500).contains(status))
    }
}
