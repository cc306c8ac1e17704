use kq_model::ErrorKind;
use thiserror::Error;

/// Errors returned by task providers.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid task definition: {0}")]
    Invalid(String),
}

impl DiscoveryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DiscoveryError::Unavailable(_) | DiscoveryError::Io(_) => ErrorKind::ImportFailure,
            DiscoveryError::Invalid(_) => ErrorKind::SerializationFailure,
        }
    }
}
