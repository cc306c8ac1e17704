use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("policy state io failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("policy state is not valid json: {0}")]
    Serialization(#[from] serde_json::Error),
}
