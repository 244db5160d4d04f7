use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{operation} failed after {attempts} attempt(s): {source}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn retries_exhausted(
        operation: impl Into<String>,
        attempts: u32,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::RetriesExhausted {
            operation: operation.into(),
            attempts,
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
