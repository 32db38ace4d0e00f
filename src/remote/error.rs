use std::error::Error;
use std::fmt;

use crate::record::Collection;

/// Error type for remote collection service calls.
#[derive(Debug)]
pub enum RemoteError {
    /// Connection to the service failed
    ConnectionFailed(String),
    /// The requested record does not exist
    NotFound { collection: Collection, id: String },
    /// The service rejected the request
    Rejected(String),
    /// Timeout waiting for the service
    Timeout,
    /// The response could not be decoded
    Decode(String),
    /// Other error
    Other(Box<dyn Error + Send + Sync>),
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteError::ConnectionFailed(msg) => write!(f, "Connection failed: {}", msg),
            RemoteError::NotFound { collection, id } => {
                write!(f, "Record not found: {}:{}", collection, id)
            }
            RemoteError::Rejected(msg) => write!(f, "Request rejected: {}", msg),
            RemoteError::Timeout => write!(f, "Request timeout"),
            RemoteError::Decode(msg) => write!(f, "Invalid response: {}", msg),
            RemoteError::Other(e) => write!(f, "Remote error: {}", e),
        }
    }
}

impl Error for RemoteError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RemoteError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<crate::record::RecordError> for RemoteError {
    fn from(err: crate::record::RecordError) -> Self {
        RemoteError::Decode(err.to_string())
    }
}
