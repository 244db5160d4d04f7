use serde::{Deserialize, Serialize};

/// Broadcast state reported by the channel endpoint.
///
/// Anything other than `online`/`offline` is kept verbatim so that new
/// upstream states still compare and display correctly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StreamStatus {
    Online,
    Offline,
    Other(String),
}

impl StreamStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::Other(s) => s,
        }
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl From<String> for StreamStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "online" => Self::Online,
            "offline" => Self::Offline,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for StreamStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<StreamStatus> for String {
    fn from(value: StreamStatus) -> Self {
        match value {
            StreamStatus::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A channel as last seen upstream. Replaced wholesale on every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// URL slug identifying the channel.
    #[serde(rename = "url")]
    pub id: String,
    pub nick: String,
    pub status: StreamStatus,
}

impl Channel {
    /// Public watch page for this channel under `watch_base_url`.
    #[must_use]
    pub fn watch_url(&self, watch_base_url: &str) -> String {
        format!("{}/{}", watch_base_url.trim_end_matches('/'), self.id)
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelResponse {
    pub data: ChannelData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChannelData {
    pub channel: Channel,
}
