//! Error types for the proxy

use thiserror::Error;

/// Result type alias for the proxy
pub type Result<T> = std::result::Result<T, ProxyError>;

/// Main error type for the proxy
///
/// Configuration errors are fatal at startup. Store and classification
/// errors at request time always fail open: the admission pipeline logs
/// them and forwards the request.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Configuration errors (startup only)
    #[error("configuration error: {0}")]
    Config(String),

    /// YAML parsing errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL in configuration
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Redis errors (request time)
    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    /// A store call exceeded the request's deadline
    #[error("store call timed out")]
    StoreTimeout,

    /// A script reply that does not match the expected shape
    #[error("malformed store reply: {0}")]
    StoreReply(String),

    /// Tenant classification errors (recovered by falling back to bypass)
    #[error("classification error: {0}")]
    Classification(String),

    /// Upstream transport errors
    #[error("upstream error: {0}")]
    Upstream(#[from] reqwest::Error),

    /// Server lifecycle errors
    #[error("server error: {0}")]
    Server(String),
}

impl ProxyError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors that count against the store error metric
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::StoreTimeout | Self::StoreReply(_)
        )
    }
}
