use std::fmt;

/// Result type for logsift-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the run controller and worker
#[derive(Debug)]
pub enum Error {
    /// Result store error
    Store(logsift_store::Error),

    /// Gateway call failed (network/auth/protocol, description only)
    Gateway(String),

    /// Configuration error
    Config(String),

    /// Invalid operation for the current run state
    InvalidOperation(String),

    /// IO operation failed
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "Store error: {}", err),
            Error::Gateway(msg) => write!(f, "Gateway error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InvalidOperation(msg) => write!(f, "Invalid operation: {}", msg),
            Error::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::Gateway(_) | Error::Config(_) | Error::InvalidOperation(_) => None,
        }
    }
}

impl From<logsift_store::Error> for Error {
    fn from(err: logsift_store::Error) -> Self {
        Error::Store(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
