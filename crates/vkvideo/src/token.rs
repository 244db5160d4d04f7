//! Client-credentials access tokens with lazy refresh.

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    tokio::{sync::Mutex, time::Instant},
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use streamwatch_metrics::{counter, vkvideo as vk_metrics};

use crate::{Error, Result, config::VkVideoConfig, types::TokenResponse};

struct CachedToken {
    access_token: Secret<String>,
    /// Already reduced by the safety margin.
    expires_at: Instant,
}

/// Hands out a bearer token, exchanging client credentials only when the
/// cached one is missing or past `expiry - safety_margin`.
///
/// The cache lock is held across the exchange, so concurrent callers at the
/// start of a poll cycle share a single token request.
pub struct TokenManager {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: Secret<String>,
    safety_margin: Duration,
    default_lifetime: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenManager {
    pub fn new(http: reqwest::Client, config: &VkVideoConfig) -> Self {
        Self {
            http,
            token_url: config.token_url(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            safety_margin: config.token_safety_margin,
            default_lifetime: config.default_token_lifetime,
            cached: Mutex::new(None),
        }
    }

    /// Return a token that is valid for at least the safety margin.
    pub async fn get_token(&self) -> Result<Secret<String>> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.expires_at
        {
            return Ok(token.access_token.clone());
        }

        let (access_token, lifetime) = self.exchange().await?;
        let usable_for = lifetime.saturating_sub(self.safety_margin);
        info!(
            lifetime_secs = lifetime.as_secs(),
            usable_for_secs = usable_for.as_secs(),
            "obtained vk video access token"
        );
        *cached = Some(CachedToken {
            access_token: access_token.clone(),
            expires_at: Instant::now() + usable_for,
        });
        Ok(access_token)
    }

    /// Drop the cached token so the next caller performs a fresh exchange.
    pub async fn invalidate(&self) {
        if self.cached.lock().await.take().is_some() {
            debug!("vk video access token invalidated");
        }
    }

    async fn exchange(&self) -> Result<(Secret<String>, Duration)> {
        #[cfg(feature = "metrics")]
        counter!(vk_metrics::TOKEN_EXCHANGES_TOTAL).increment(1);

        let result = self.request_token().await;
        if let Err(e) = &result {
            warn!(error = %e, "vk video token exchange failed");
            #[cfg(feature = "metrics")]
            counter!(vk_metrics::TOKEN_EXCHANGE_ERRORS_TOTAL).increment(1);
        }
        result
    }

    async fn request_token(&self) -> Result<(Secret<String>, Duration)> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| Error::auth_external("token request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "token endpoint returned {status}: {}",
                snippet(&body)
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth_external("malformed token response", e))?;
        if body.access_token.is_empty() {
            return Err(Error::auth("token endpoint returned an empty access_token"));
        }

        let lifetime = body
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(self.default_lifetime);
        Ok((Secret::new(body.access_token), lifetime))
    }
}

pub(crate) fn snippet(body: &str) -> String {
    const MAX_CHARS: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("{cut}…")
    }
}
