/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Everything that can go wrong inside an adapter. None of these cross the
/// `AlertSource` boundary; they are logged and turned into an empty contribution.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Transport failed: {0}")]
    Transport(#[from] anyhow::Error),

    #[error("Unparseable feed: {0}")]
    Parse(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Rate limit reached for {source_name}")]
    RateLimited { source_name: String },
}
