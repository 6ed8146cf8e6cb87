//! Cluster cache errors.

use thiserror::Error;

/// Errors reported by a [`ClusterCache`](crate::ClusterCache).
#[derive(Debug, Error)]
pub enum CacheError {
    /// The shared store could not be reached.
    #[error("Cluster cache unavailable: {0}")]
    Unavailable(String),

    /// A stored value could not be encoded or decoded.
    #[error("Cluster cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_display() {
        let err = CacheError::Unavailable("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CacheError::from(serde_err);
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
