//! In-memory stand-ins for the upstream API and the messaging platform.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    streamwatch_vkvideo::{Channel, Error as UpstreamError},
    tokio::sync::{Barrier, Semaphore},
};

use crate::{
    dispatch::Notifier, error::DeliveryError, format::TextFormat, registry::ChannelSource,
    subscribers::RecipientId,
};

pub(crate) fn ids<const N: usize>(ids: [&str; N]) -> Vec<String> {
    ids.iter().map(|id| (*id).to_string()).collect()
}

#[derive(Default)]
pub(crate) struct FakeSource {
    statuses: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    barrier: Mutex<Option<Arc<Barrier>>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    auth_delay: Mutex<Option<Duration>>,
    auth_fails: AtomicBool,
    panics: AtomicBool,
    pub authorizations: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl FakeSource {
    pub fn new<const N: usize>(channels: [(&str, &str); N]) -> Self {
        let source = Self::default();
        for (id, status) in channels {
            source.set_status(id, status);
        }
        source
    }

    pub fn set_status(&self, id: &str, status: &str) {
        self.statuses
            .lock()
            .unwrap()
            .insert(id.to_string(), status.to_string());
    }

    pub fn fail(&self, id: &str) {
        self.failing.lock().unwrap().insert(id.to_string());
    }

    pub fn recover(&self, id: &str) {
        self.failing.lock().unwrap().remove(id);
    }

    pub fn hang(&self, id: &str) {
        self.hanging.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_authorization(&self, fails: bool) {
        self.auth_fails.store(fails, Ordering::SeqCst);
    }

    pub fn panic_on_fetch(&self, panics: bool) {
        self.panics.store(panics, Ordering::SeqCst);
    }

    /// Make every fetch wait until `n` fetches are in flight at once.
    pub fn rendezvous(&self, n: usize) {
        *self.barrier.lock().unwrap() = Some(Arc::new(Barrier::new(n)));
    }

    /// Fetches read their status, then stall until [`Self::release_fetches`].
    pub fn hold_fetches(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_fetches(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.close();
        }
    }

    /// The next authorization takes `delay` before succeeding.
    pub fn slow_authorization_once(&self, delay: Duration) {
        *self.auth_delay.lock().unwrap() = Some(delay);
    }

    pub fn network_calls(&self) -> usize {
        self.authorizations.load(Ordering::SeqCst) + self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChannelSource for FakeSource {
    async fn authorize(&self) -> streamwatch_vkvideo::Result<()> {
        self.authorizations.fetch_add(1, Ordering::SeqCst);
        let delay = self.auth_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.auth_fails.load(Ordering::SeqCst) {
            return Err(UpstreamError::auth("token endpoint returned 401 Unauthorized"));
        }
        Ok(())
    }

    async fn fetch(&self, channel_id: &str) -> streamwatch_vkvideo::Result<Channel> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let barrier = self.barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        if self.panics.load(Ordering::SeqCst) {
            panic!("fetch exploded");
        }
        let hangs = self.hanging.lock().unwrap().contains(channel_id);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(channel_id) {
            return Err(UpstreamError::upstream(channel_id, "HTTP 500"));
        }

        let status = self.statuses.lock().unwrap().get(channel_id).cloned();
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            // Closed means released.
            let _ = gate.acquire().await;
        }
        let status = status.ok_or_else(|| UpstreamError::upstream(channel_id, "HTTP 404"))?;
        Ok(Channel {
            id: channel_id.to_string(),
            nick: channel_id.to_uppercase(),
            status: status.into(),
        })
    }
}

#[derive(Default)]
pub(crate) struct FakeNotifier {
    sent: Mutex<Vec<(RecipientId, String)>>,
    blocked: Mutex<HashSet<RecipientId>>,
    broken: Mutex<HashSet<RecipientId>>,
    pub format: TextFormat,
}

impl FakeNotifier {
    pub fn plain() -> Self {
        Self {
            format: TextFormat::Plain,
            ..Self::default()
        }
    }

    /// Sends to `recipient` fail as if it blocked the bot.
    pub fn block(&self, recipient: RecipientId) {
        self.blocked.lock().unwrap().insert(recipient);
    }

    /// Sends to `recipient` fail with a transient error.
    pub fn break_for(&self, recipient: RecipientId) {
        self.broken.lock().unwrap().insert(recipient);
    }

    pub fn sent(&self) -> Vec<(RecipientId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: RecipientId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| *to == recipient)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    fn text_format(&self, _to: RecipientId) -> TextFormat {
        self.format
    }

    async fn send(
        &self,
        to: RecipientId,
        text: &str,
        _format: TextFormat,
    ) -> Result<(), DeliveryError> {
        if self.blocked.lock().unwrap().contains(&to) {
            return Err(DeliveryError::unreachable(
                "Forbidden: bot was blocked by the user",
            ));
        }
        if self.broken.lock().unwrap().contains(&to) {
            return Err(DeliveryError::failed("connection reset"));
        }
        self.sent.lock().unwrap().push((to, text.to_string()));
        Ok(())
    }
}
