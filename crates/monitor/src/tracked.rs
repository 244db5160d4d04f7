//! The fixed list of channels to poll, loaded once at startup.

use std::{collections::HashSet, path::Path, sync::Arc};

use {serde::Deserialize, tracing::{info, warn}};

use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct ChannelsFile {
    #[serde(default)]
    urls: Vec<String>,
}

/// Channel identifiers in configured order. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedChannels {
    ids: Arc<[String]>,
}

impl TrackedChannels {
    /// Blank entries are dropped; duplicates keep their first position.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let ids: Vec<String> = ids
            .into_iter()
            .map(|id| id.into().trim().to_string())
            .filter(|id| !id.is_empty())
            .filter(|id| {
                let fresh = seen.insert(id.clone());
                if !fresh {
                    warn!(channel = %id, "duplicate tracked channel ignored");
                }
                fresh
            })
            .collect();
        Self { ids: ids.into() }
    }

    /// Parse a `{"urls": [...]}` file.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ChannelsFile =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::new(file.urls))
    }

    /// Like [`Self::try_load`], but an unusable file yields an empty set so
    /// the bot still starts (polling just has nothing to do).
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(tracked) => {
                info!(path = %path.display(), count = tracked.len(), "loaded tracked channels");
                tracked
            },
            Err(e) => {
                warn!(error = %e, "tracked channel list unavailable, polling disabled");
                Self::default()
            },
        }
    }

    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
