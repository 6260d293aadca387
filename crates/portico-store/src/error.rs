use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid content identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Backend error: {0}")]
    Backend(String),
}
