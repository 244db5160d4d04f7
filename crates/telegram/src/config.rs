use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    streamwatch_common::retry::{Backoff, RetryPolicy},
};

/// Long-poll timeout passed to `getUpdates`.
pub const DEFAULT_LONG_POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the bot.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub token: Secret<String>,

    /// How `getMe` is retried at startup before giving up.
    pub connect_policy: RetryPolicy,

    pub long_poll_timeout: Duration,

    /// Override of the Bot API endpoint, used by tests.
    pub api_url: Option<url::Url>,
}

impl TelegramConfig {
    pub fn new(token: Secret<String>) -> Self {
        Self {
            token,
            connect_policy: RetryPolicy::default(),
            long_poll_timeout: DEFAULT_LONG_POLL_TIMEOUT,
            api_url: None,
        }
    }

    #[must_use]
    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_policy = RetryPolicy::new(attempts, Backoff::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        });
        self
    }

    /// Build a bot whose HTTP timeout outlasts the long-poll timeout.
    pub fn build_bot(&self) -> crate::Result<teloxide::Bot> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(self.long_poll_timeout + Duration::from_secs(15))
            .build()
            .map_err(|e| crate::Error::message(format!("failed to build HTTP client: {e}")))?;
        let bot = teloxide::Bot::with_client(self.token.expose_secret(), client);
        Ok(match &self.api_url {
            Some(url) => bot.set_api_url(url.clone()),
            None => bot,
        })
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("connect_policy", &self.connect_policy)
            .field("long_poll_timeout", &self.long_poll_timeout)
            .field("api_url", &self.api_url)
            .finish()
    }
}
