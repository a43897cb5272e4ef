use thiserror::Error;

#[derive(Error, Debug)]
pub enum MicrodropError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV Error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("Not Found: {0}")]
    NotFound(String),
}

impl MicrodropError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for errors that are shown to the user rather than treated as faults.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type MdResult<T> = Result<T, MicrodropError>;
