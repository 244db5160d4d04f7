//! One poll cycle: refresh, diff, notify.

use std::sync::Arc;

use {
    tokio::time::Instant,
    tracing::{debug, info},
};

#[cfg(feature = "metrics")]
use streamwatch_metrics::{counter, histogram, labels, monitor as monitor_metrics};

use crate::{
    Result,
    diff::diff,
    dispatch::Dispatcher,
    format::{self, TextFormat},
    registry::StatusRegistry,
    subscribers::SubscriberSet,
    tracked::TrackedChannels,
};

/// What a cycle ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Nobody is subscribed or nothing is tracked; no network calls were made.
    Idle,
    Completed {
        changes: usize,
        /// Channels whose fetch failed and kept their previous status.
        fetch_failures: usize,
        delivered: usize,
        delivery_failures: usize,
    },
}

pub struct MonitorService {
    tracked: TrackedChannels,
    registry: Arc<StatusRegistry>,
    subscribers: Arc<SubscriberSet>,
    dispatcher: Dispatcher,
}

impl MonitorService {
    pub fn new(
        tracked: TrackedChannels,
        registry: Arc<StatusRegistry>,
        subscribers: Arc<SubscriberSet>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            tracked,
            registry,
            subscribers,
            dispatcher,
        }
    }

    #[must_use]
    pub fn subscribers(&self) -> &Arc<SubscriberSet> {
        &self.subscribers
    }

    /// Run one refresh-diff-notify cycle.
    ///
    /// Returns an error only when the refresh could not start at all
    /// (authorization failed); the published snapshot is then unchanged.
    pub async fn run_cycle(&self) -> Result<CycleOutcome> {
        if self.subscribers.is_empty() {
            debug!("no subscribers, skipping poll cycle");
            Self::record_outcome("idle");
            return Ok(CycleOutcome::Idle);
        }
        if self.tracked.is_empty() {
            debug!("no tracked channels, skipping poll cycle");
            Self::record_outcome("idle");
            return Ok(CycleOutcome::Idle);
        }

        let started = Instant::now();
        let refresh = match self.registry.refresh_all(self.tracked.ids()).await {
            Ok(refresh) => refresh,
            Err(e) => {
                Self::record_outcome("aborted");
                return Err(e);
            },
        };

        let changes = diff(&refresh.old, &refresh.new);
        let mut delivered = 0;
        let mut delivery_failures = 0;
        for change in &changes {
            info!(
                channel = %change.channel_id(),
                from = %change.old_status,
                to = %change.new_status(),
                "channel status changed"
            );
            let report = self.dispatcher.notify(change).await;
            delivered += report.delivered;
            delivery_failures += report.failed;
        }

        let elapsed = started.elapsed();
        #[cfg(feature = "metrics")]
        {
            counter!(monitor_metrics::STATUS_CHANGES_TOTAL).increment(changes.len() as u64);
            histogram!(monitor_metrics::POLL_CYCLE_DURATION_SECONDS).record(elapsed.as_secs_f64());
        }
        Self::record_outcome("completed");

        info!(
            channels = refresh.new.len(),
            changes = changes.len(),
            fetch_failures = refresh.failures.len(),
            delivered,
            delivery_failures,
            elapsed_ms = elapsed.as_millis() as u64,
            "poll cycle finished"
        );

        Ok(CycleOutcome::Completed {
            changes: changes.len(),
            fetch_failures: refresh.failures.len(),
            delivered,
            delivery_failures,
        })
    }

    /// Human-readable status of every tracked channel, read from the
    /// registry's current snapshot.
    ///
    /// If nothing has been published yet, one baseline refresh is done first.
    /// A report requested while a poll cycle is refreshing waits for that
    /// cycle's snapshot rather than fetching and publishing its own.
    pub async fn status_report(&self, format: TextFormat) -> Result<String> {
        if self.tracked.is_empty() {
            return Ok(format::text(format, "No channels are being tracked."));
        }

        let snapshot = self.registry.ensure_baseline(self.tracked.ids()).await?;
        Ok(format::status_report(
            &snapshot,
            self.dispatcher.watch_base_url(),
            format,
        ))
    }

    #[cfg(feature = "metrics")]
    fn record_outcome(outcome: &'static str) {
        counter!(monitor_metrics::POLL_CYCLES_TOTAL, labels::OUTCOME => outcome).increment(1);
    }

    #[cfg(not(feature = "metrics"))]
    fn record_outcome(_outcome: &'static str) {}
}
