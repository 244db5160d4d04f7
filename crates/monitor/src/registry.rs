//! Last-known status of every tracked channel.
//!
//! The registry publishes an immutable [`Snapshot`] behind an `Arc`. A refresh
//! builds a complete replacement off to the side and swaps it in only after
//! every per-channel fetch has settled, so readers see either the previous
//! snapshot or the new one, never a mix.

use std::{
    sync::{Arc, RwLock},
    time::Duration,
};

use {
    async_trait::async_trait,
    indexmap::IndexMap,
    streamwatch_vkvideo::{Channel, VkVideoClient},
    tokio::sync::Mutex,
    tracing::{debug, warn},
};

#[cfg(feature = "metrics")]
use streamwatch_metrics::{counter, monitor as monitor_metrics};

use crate::Result;

/// Where channel states come from.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    /// Called once before a refresh fans out. An error here aborts the
    /// refresh: without credentials none of the fetches can succeed.
    async fn authorize(&self) -> streamwatch_vkvideo::Result<()> {
        Ok(())
    }

    async fn fetch(&self, channel_id: &str) -> streamwatch_vkvideo::Result<Channel>;
}

#[async_trait]
impl ChannelSource for VkVideoClient {
    async fn authorize(&self) -> streamwatch_vkvideo::Result<()> {
        VkVideoClient::authorize(self).await
    }

    async fn fetch(&self, channel_id: &str) -> streamwatch_vkvideo::Result<Channel> {
        self.fetch_channel(channel_id).await
    }
}

/// Channel id → channel, in tracked order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    channels: IndexMap<String, Channel>,
}

impl Snapshot {
    /// Keyed by each channel's own id.
    pub fn from_channels(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self {
            channels: channels.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, channel_id: &str) -> Option<&Channel> {
        self.channels.get(channel_id)
    }

    #[must_use]
    pub fn contains(&self, channel_id: &str) -> bool {
        self.channels.contains_key(channel_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// `(tracked id, channel)` pairs in order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Channel)> {
        self.channels.iter().map(|(id, c)| (id.as_str(), c))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Result of one [`StatusRegistry::refresh_all`].
#[derive(Debug)]
pub struct Refresh {
    pub old: Arc<Snapshot>,
    pub new: Arc<Snapshot>,
    /// Per-channel failures; those channels kept their previous entry.
    pub failures: Vec<streamwatch_vkvideo::Error>,
}

pub struct StatusRegistry {
    source: Arc<dyn ChannelSource>,
    fetch_timeout: Duration,
    current: RwLock<Arc<Snapshot>>,
    /// Serializes refreshes so two cycles never race the swap.
    refresh_lock: Mutex<()>,
}

impl StatusRegistry {
    pub fn new(source: Arc<dyn ChannelSource>, fetch_timeout: Duration) -> Self {
        Self {
            source,
            fetch_timeout,
            current: RwLock::new(Arc::new(Snapshot::default())),
            refresh_lock: Mutex::new(()),
        }
    }

    /// The currently published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(|e| e.into_inner()))
    }

    /// Fetch every channel concurrently and publish the combined result.
    ///
    /// A channel whose fetch fails or times out keeps its previous entry (or
    /// stays absent if it never had one). Only an authorization failure
    /// aborts, leaving the published snapshot untouched.
    pub async fn refresh_all(&self, channel_ids: &[String]) -> Result<Refresh> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked(channel_ids).await
    }

    /// The published snapshot, fetching a first one if nothing has been
    /// published yet.
    ///
    /// Emptiness is checked under the refresh lock, so a caller queued behind
    /// an in-flight refresh sees its result instead of publishing over it.
    pub async fn ensure_baseline(&self, channel_ids: &[String]) -> Result<Arc<Snapshot>> {
        let _guard = self.refresh_lock.lock().await;
        let current = self.snapshot();
        if !current.is_empty() {
            return Ok(current);
        }
        Ok(self.refresh_locked(channel_ids).await?.new)
    }

    /// Caller holds `refresh_lock`.
    async fn refresh_locked(&self, channel_ids: &[String]) -> Result<Refresh> {
        let old = self.snapshot();

        self.source.authorize().await?;

        let results = futures::future::join_all(
            channel_ids
                .iter()
                .map(|id| async move { (id, self.fetch_with_timeout(id).await) }),
        )
        .await;

        let mut channels = IndexMap::with_capacity(channel_ids.len());
        let mut failures = Vec::new();
        for (id, result) in results {
            match result {
                Ok(channel) => {
                    channels.insert(id.clone(), channel);
                },
                Err(e) => {
                    let previous = old.get(id);
                    warn!(
                        channel = %id,
                        error = %e,
                        kept_previous = previous.is_some(),
                        "channel fetch failed, keeping last known status"
                    );
                    if let Some(previous) = previous {
                        channels.insert(id.clone(), previous.clone());
                    }
                    failures.push(e);
                },
            }
        }

        #[cfg(feature = "metrics")]
        counter!(monitor_metrics::CHANNELS_RETAINED_TOTAL).increment(failures.len() as u64);

        let new = Arc::new(Snapshot { channels });
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Arc::clone(&new);
        debug!(
            channels = new.len(),
            failed = failures.len(),
            "status snapshot published"
        );

        Ok(Refresh { old, new, failures })
    }

    async fn fetch_with_timeout(&self, channel_id: &str) -> streamwatch_vkvideo::Result<Channel> {
        match tokio::time::timeout(self.fetch_timeout, self.source.fetch(channel_id)).await {
            Ok(result) => result,
            Err(_) => Err(streamwatch_vkvideo::Error::timeout(
                channel_id,
                self.fetch_timeout,
            )),
        }
    }
}
