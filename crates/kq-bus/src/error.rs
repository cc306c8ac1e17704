use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("channel closed")]
    Closed,

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "http")]
    #[error("http transport failed: {0}")]
    Http(#[from] reqwest::Error),
}
