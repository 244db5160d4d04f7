use {
    reqwest::StatusCode,
    secrecy::ExposeSecret,
    std::time::Duration,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use streamwatch_metrics::{counter, vkvideo as vk_metrics};

use crate::{
    Error, Result,
    config::VkVideoConfig,
    token::{TokenManager, snippet},
    types::{Channel, ChannelResponse},
};

/// Channel status lookups against the VK Video Live API.
pub struct VkVideoClient {
    http: reqwest::Client,
    channel_url: String,
    request_timeout: Duration,
    tokens: TokenManager,
}

impl VkVideoClient {
    pub fn new(config: &VkVideoConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::with_http(http, config))
    }

    /// Build on an existing HTTP client (shares its connection pool).
    pub fn with_http(http: reqwest::Client, config: &VkVideoConfig) -> Self {
        Self {
            tokens: TokenManager::new(http.clone(), config),
            http,
            channel_url: config.channel_url(),
            request_timeout: config.request_timeout,
        }
    }

    /// Make sure a usable access token is cached.
    pub async fn authorize(&self) -> Result<()> {
        self.tokens.get_token().await.map(drop)
    }

    /// Fetch the current state of a single channel.
    pub async fn fetch_channel(&self, channel_id: &str) -> Result<Channel> {
        #[cfg(feature = "metrics")]
        counter!(vk_metrics::CHANNEL_FETCHES_TOTAL).increment(1);

        let result = self.request_channel(channel_id).await;

        #[cfg(feature = "metrics")]
        if result.is_err() {
            counter!(vk_metrics::CHANNEL_FETCH_ERRORS_TOTAL).increment(1);
        }

        result
    }

    async fn request_channel(&self, channel_id: &str) -> Result<Channel> {
        let token = self.tokens.get_token().await?;

        let response = self
            .http
            .get(&self.channel_url)
            .bearer_auth(token.expose_secret())
            .query(&[("channel_url", channel_id)])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::timeout(channel_id, self.request_timeout)
                } else {
                    Error::upstream_external(channel_id, "request failed", e)
                }
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            warn!(
                channel = channel_id,
                "channel endpoint rejected the access token, dropping it"
            );
            self.tokens.invalidate().await;
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::upstream(
                channel_id,
                format!("HTTP {status}: {}", snippet(&body)),
            ));
        }

        let body: ChannelResponse = response
            .json()
            .await
            .map_err(|e| Error::upstream_external(channel_id, "malformed channel response", e))?;
        let channel = body.data.channel;
        debug!(channel = %channel.id, status = %channel.status, "fetched channel");
        Ok(channel)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        mockito::Matcher,
        secrecy::Secret,
        super::*,
        crate::types::StreamStatus,
    };

    async fn server_with_token() -> (mockito::ServerGuard, mockito::Mock) {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/oauth/server/token")
            .with_status(200)
            .with_body(r#"{"access_token":"bearer-1","expires_in":3600}"#)
            .create_async()
            .await;
        (server, token)
    }

    fn client(server: &mockito::ServerGuard) -> VkVideoClient {
        let config = VkVideoConfig::new("client", Secret::new("secret".into()))
            .with_base_url(server.url());
        VkVideoClient::new(&config).unwrap()
    }

    fn channel_body(url: &str, nick: &str, status: &str) -> String {
        serde_json::json!({
            "data": { "channel": { "url": url, "nick": nick, "status": status } }
        })
        .to_string()
    }

    #[tokio::test]
    async fn fetch_channel_parses_status() {
        let (mut server, _token) = server_with_token().await;
        let mock = server
            .mock("GET", "/v1/channel")
            .match_query(Matcher::UrlEncoded("channel_url".into(), "lobby".into()))
            .match_header("authorization", "Bearer bearer-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(channel_body("lobby", "Lobby", "online"))
            .create_async()
            .await;

        let channel = client(&server).fetch_channel("lobby").await.unwrap();
        assert_eq!(channel.id, "lobby");
        assert_eq!(channel.nick, "Lobby");
        assert_eq!(channel.status, StreamStatus::Online);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let (mut server, _token) = server_with_token().await;
        let _mock = server
            .mock("GET", "/v1/channel")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body(r#"{"error":"not_found"}"#)
            .create_async()
            .await;

        let err = client(&server).fetch_channel("ghost").await.unwrap_err();
        assert!(matches!(&err, Error::Upstream { channel, .. } if channel == "ghost"));
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn malformed_body_is_upstream_error() {
        let (mut server, _token) = server_with_token().await;
        let _mock = server
            .mock("GET", "/v1/channel")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"data":{}}"#)
            .create_async()
            .await;

        let err = client(&server).fetch_channel("lobby").await.unwrap_err();
        assert!(matches!(err, Error::Upstream { .. }));
    }

    #[tokio::test]
    async fn unauthorized_drops_cached_token() {
        let mut server = mockito::Server::new_async().await;
        let token = server
            .mock("POST", "/oauth/server/token")
            .with_status(200)
            .with_body(r#"{"access_token":"bearer-1","expires_in":3600}"#)
            .expect(2)
            .create_async()
            .await;
        let _channel = server
            .mock("GET", "/v1/channel")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let client = client(&server);
        assert!(client.fetch_channel("lobby").await.is_err());
        assert!(client.fetch_channel("lobby").await.is_err());
        token.assert_async().await;
    }

    #[tokio::test]
    async fn token_failure_surfaces_as_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/oauth/server/token")
            .with_status(403)
            .create_async()
            .await;
        let channel = server
            .mock("GET", "/v1/channel")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = client(&server);
        assert!(client.authorize().await.unwrap_err().is_auth());
        assert!(client.fetch_channel("lobby").await.unwrap_err().is_auth());
        channel.assert_async().await;
    }
}
