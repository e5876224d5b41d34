use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("graph store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("graph store returned a payload too large for the current page size")]
    PayloadTooLarge,

    #[error("graph store connection closed prematurely")]
    ConnectionClosedPrematurely,

    #[error("graph store resolver exceeded its code size limit")]
    ResolverCodeSize,

    #[error("search index rejected {0} of {1} resources in this batch")]
    UnprocessedSearchIndexResources(usize, usize),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("graph store returned an error response: {0}")]
    GraphQlError(String),
}

impl StoreError {
    /// Classifies a graph-store error response body against the three
    /// recoverable-error signals the spec names. Unrecognized bodies fall
    /// through as a plain `GraphQlError`.
    pub fn classify(message: &str) -> Self {
        if message.contains("payload too large") {
            Self::PayloadTooLarge
        } else if message.contains("connection closed prematurely") {
            Self::ConnectionClosedPrematurely
        } else if message.contains("resolver") && message.contains("code size") {
            Self::ResolverCodeSize
        } else {
            Self::GraphQlError(message.to_string())
        }
    }

    /// Only `ConnectionClosedPrematurely` gets one automatic retry; the
    /// other two recoverable signals bail immediately per §4.2/§7.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionClosedPrematurely)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_payload_too_large() {
        assert!(matches!(
            StoreError::classify("payload too large for this request"),
            StoreError::PayloadTooLarge
        ));
    }

    #[test]
    fn classifies_connection_closed_as_retryable() {
        let err = StoreError::classify("connection closed prematurely");
        assert!(err.is_retryable());
    }

    #[test]
    fn classifies_resolver_code_size_as_non_retryable() {
        let err = StoreError::classify("Lambda resolver exceeded maximum code size");
        assert!(!err.is_retryable());
        assert!(matches!(err, StoreError::ResolverCodeSize));
    }
}
