use std::time::Duration;

use secrecy::{ExposeSecret, Secret};

pub const DEFAULT_API_BASE_URL: &str = "https://api.live.vkvideo.ru";
pub const DEFAULT_CHANNEL_API_BASE_URL: &str = "https://apidev.live.vkvideo.ru";

/// Lifetime assumed when the token endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(86_400);

/// Subtracted from every token lifetime so a token is never used right up to
/// its real expiry.
pub const TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(300);

/// Connection settings for the VK Video Live API.
#[derive(Clone)]
pub struct VkVideoConfig {
    pub client_id: String,
    pub client_secret: Secret<String>,
    /// Base URL of the OAuth server (`/oauth/server/token`).
    pub api_base_url: String,
    /// Base URL of the channel endpoint (`/v1/channel`).
    pub channel_api_base_url: String,
    /// Per-request timeout applied by the HTTP client.
    pub request_timeout: Duration,
    pub token_safety_margin: Duration,
    pub default_token_lifetime: Duration,
}

impl VkVideoConfig {
    #[must_use]
    pub fn new(client_id: impl Into<String>, client_secret: Secret<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            api_base_url: DEFAULT_API_BASE_URL.into(),
            channel_api_base_url: DEFAULT_CHANNEL_API_BASE_URL.into(),
            request_timeout: Duration::from_secs(15),
            token_safety_margin: TOKEN_SAFETY_MARGIN,
            default_token_lifetime: DEFAULT_TOKEN_LIFETIME,
        }
    }

    /// Point both endpoints at the same host (used by tests against a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.api_base_url = base_url.clone();
        self.channel_api_base_url = base_url;
        self
    }

    pub(crate) fn token_url(&self) -> String {
        format!(
            "{}/oauth/server/token",
            self.api_base_url.trim_end_matches('/')
        )
    }

    pub(crate) fn channel_url(&self) -> String {
        format!("{}/v1/channel", self.channel_api_base_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for VkVideoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VkVideoConfig")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &if self.client_secret.expose_secret().is_empty() {
                    "[EMPTY]"
                } else {
                    "[REDACTED]"
                },
            )
            .field("api_base_url", &self.api_base_url)
            .field("channel_api_base_url", &self.channel_api_base_url)
            .field("request_timeout_secs", &self.request_timeout.as_secs())
            .finish_non_exhaustive()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secret() {
        let cfg = VkVideoConfig::new("client", Secret::new("hunter2".into()));
        let rendered = format!("{cfg:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn endpoint_urls_ignore_trailing_slash() {
        let cfg = VkVideoConfig::new("client", Secret::new("s".into()))
            .with_base_url("http://127.0.0.1:1234/");
        assert_eq!(cfg.token_url(), "http://127.0.0.1:1234/oauth/server/token");
        assert_eq!(cfg.channel_url(), "http://127.0.0.1:1234/v1/channel");
    }
}
