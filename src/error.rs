use miette::Diagnostic;
use thiserror::Error;

/// Result type for block ordering operations
pub type Result<T> = std::result::Result<T, Error>;

/// Custom error types for graph loading, configuration and verification
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum Error {
    #[error("I/O error: {0}")]
    #[diagnostic(code(blockorder::io_error))]
    Io(String),

    #[error("Parse error: {message}")]
    #[diagnostic(code(blockorder::parse_error))]
    Parse { message: String },

    #[error("Invalid graph: {message}")]
    #[diagnostic(
        code(blockorder::invalid_graph),
        help("every block must be reachable from block 0 and edges must reference existing blocks")
    )]
    InvalidGraph { message: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(blockorder::config_error))]
    Config { message: String },

    #[error("Order verification failed: {message}")]
    #[diagnostic(code(blockorder::verification_error))]
    Verification { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(blockorder::internal_error))]
    Internal { message: String },
}

impl Error {
    /// Create an invalid graph error
    pub fn invalid_graph(message: impl Into<String>) -> Self {
        Error::InvalidGraph {
            message: message.into(),
        }
    }

    /// Create a verification error
    pub fn verification(message: impl Into<String>) -> Self {
        Error::Verification {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse {
            message: err.to_string(),
        }
    }
}
