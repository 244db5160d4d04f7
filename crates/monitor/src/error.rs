use std::{error::Error as StdError, path::PathBuf};

use thiserror::Error;

/// Errors that abort a whole poll cycle or status query.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Upstream(#[from] streamwatch_vkvideo::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The tracked-channel file could not be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A message could not be delivered to one recipient.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The recipient revoked access (blocked the bot, left the chat, deleted
    /// the account). Retrying is pointless.
    #[error("recipient unreachable: {reason}")]
    Unreachable { reason: String },

    #[error("delivery failed: {message}")]
    Failed {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl DeliveryError {
    #[must_use]
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn failed_external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Failed {
            message: context.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}
