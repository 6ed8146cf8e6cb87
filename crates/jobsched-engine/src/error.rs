//! Error types for the scheduling engine.

use jobsched_protocols::CacheError;
use thiserror::Error;

/// Errors that can occur while building or running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The cluster cache failed.
    #[error("Cluster cache error: {0}")]
    Cache(#[from] CacheError),

    /// A cluster record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No tokio runtime to spawn tasks on.
    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    /// The engine configuration is invalid.
    #[error("Invalid engine configuration: {0}")]
    InvalidConfiguration(String),
}
