use thiserror::Error;

/// Errors raised while turning a single audit record into metrics.
#[derive(Debug, Error)]
pub enum MetricError {
    /// A bulk/msearch command line could not be parsed as JSON.
    #[error("malformed request body at line {line}: {source}")]
    RequestBody {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A bulk/msearch command line parsed, but is not a JSON object.
    #[error("request body line {line} is not a JSON object")]
    RequestBodyShape { line: usize },
}

/// Errors raised while validating and compiling configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported audit category {0:?}")]
    UnsupportedCategory(String),

    #[error("tag is mandatory")]
    MissingTag,

    #[error("invalid aggregation pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("event_stream_size must be greater than zero")]
    EmptyEventStream,
}

pub type Result<T> = std::result::Result<T, MetricError>;
