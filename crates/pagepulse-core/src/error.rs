use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fatal init-time errors. Everything else the agent swallows: storage and
/// delivery failures are recovered locally and never reach the host.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid init options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    #[error("app_id is required and must be a non-empty string")]
    MissingAppId,

    #[error("invalid collector endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("batch_size must be at least 1")]
    InvalidBatchSize,

    #[error("flush_interval_ms must be at least 1")]
    InvalidFlushInterval,
}
