use std::{error::Error as StdError, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The token exchange was rejected or could not be completed.
    #[error("authentication failed: {message}")]
    Auth {
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// A single channel lookup failed.
    #[error("channel {channel}: {message}")]
    Upstream {
        channel: String,
        message: String,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },

    /// A single channel lookup did not settle in time.
    #[error("channel {channel}: no response within {}s", timeout.as_secs())]
    Timeout { channel: String, timeout: Duration },

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

impl Error {
    #[must_use]
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn auth_external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Auth {
            message: context.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn upstream(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            channel: channel.into(),
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn upstream_external(
        channel: impl Into<String>,
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Upstream {
            channel: channel.into(),
            message: context.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn timeout(channel: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            channel: channel.into(),
            timeout,
        }
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
