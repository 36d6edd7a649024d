//! Error types for gtforge

use thiserror::Error;

/// Main error type for gtforge operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unknown object category: {0}")]
    UnknownCategory(String),

    #[error("Singular transform: {0}")]
    SingularTransform(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl Error {
    /// Build a parse error for a 1-based line number
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for gtforge operations
pub type Result<T> = std::result::Result<T, Error>;
