//! Recipients that receive status announcements.
//!
//! Created once at startup and shared by the command handlers (subscribe,
//! unsubscribe) and the dispatcher (fan-out, removal of blocked recipients).
//! Membership lives in memory only and is lost on restart.

use std::{collections::BTreeSet, sync::RwLock};

#[cfg(feature = "metrics")]
use streamwatch_metrics::{gauge, monitor as monitor_metrics};

/// Chat identifier on the messaging platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecipientId(pub i64);

impl std::fmt::Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct SubscriberSet {
    // std RwLock: never held across an await point.
    inner: RwLock<BTreeSet<RecipientId>>,
}

impl SubscriberSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the recipient was already subscribed.
    pub fn add(&self, recipient: RecipientId) -> bool {
        let mut set = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let added = set.insert(recipient);
        Self::record_len(set.len());
        added
    }

    /// Returns `false` if the recipient was not subscribed.
    pub fn remove(&self, recipient: RecipientId) -> bool {
        let mut set = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let removed = set.remove(&recipient);
        Self::record_len(set.len());
        removed
    }

    #[must_use]
    pub fn contains(&self, recipient: RecipientId) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&recipient)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Point-in-time copy for fan-out; later changes don't affect it.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RecipientId> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .copied()
            .collect()
    }

    #[cfg(feature = "metrics")]
    fn record_len(len: usize) {
        gauge!(monitor_metrics::SUBSCRIBERS).set(len as f64);
    }

    #[cfg(not(feature = "metrics"))]
    fn record_len(_len: usize) {}
}
