use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid series: {0}")]
    InvalidSeries(String),

    #[error("Source unavailable for {0}: primary and fallback both failed")]
    SourceUnavailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Artifact store error: {0}")]
    StoreError(String),
}

impl From<std::io::Error> for IndexError {
    fn from(e: std::io::Error) -> Self {
        IndexError::StoreError(e.to_string())
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        IndexError::StoreError(e.to_string())
    }
}
