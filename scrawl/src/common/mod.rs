pub mod config;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrawlError {
    #[error("model error: {0}")]
    ModelError(String),

    #[error("tokenization error: {0}")]
    TokenizationError(String),

    #[error("image error: {0}")]
    ImageError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Other(String),
}

pub type ScrawlResult<T> = Result<T, ScrawlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_carries_context() {
        let err = ScrawlError::ModelError("weights not found".to_string());
        assert_eq!(err.to_string(), "model error: weights not found");

        let err = ScrawlError::Other("oops".to_string());
        assert_eq!(err.to_string(), "oops");
    }
}
