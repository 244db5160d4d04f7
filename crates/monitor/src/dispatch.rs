//! Fan-out of status announcements to subscribers.

use std::sync::Arc;

use {
    async_trait::async_trait,
    streamwatch_common::fanout::attempt_all,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use streamwatch_metrics::{counter, monitor as monitor_metrics};

use crate::{
    diff::StatusChange,
    error::DeliveryError,
    format::{self, TextFormat},
    subscribers::{RecipientId, SubscriberSet},
};

/// Deliveries to different recipients that may be in flight at once.
pub const DEFAULT_DELIVERY_CONCURRENCY: usize = 8;

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Rich-text dialect to render for `to`.
    fn text_format(&self, _to: RecipientId) -> TextFormat {
        TextFormat::Html
    }

    async fn send(
        &self,
        to: RecipientId,
        text: &str,
        format: TextFormat,
    ) -> Result<(), DeliveryError>;
}

/// Outcome of announcing one change.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
    /// Recipients dropped from the subscriber set because they blocked the bot.
    pub removed: Vec<RecipientId>,
}

pub struct Dispatcher {
    notifier: Arc<dyn Notifier>,
    subscribers: Arc<SubscriberSet>,
    watch_base_url: String,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        subscribers: Arc<SubscriberSet>,
        watch_base_url: impl Into<String>,
    ) -> Self {
        Self {
            notifier,
            subscribers,
            watch_base_url: watch_base_url.into(),
            concurrency: DEFAULT_DELIVERY_CONCURRENCY,
        }
    }

    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub fn watch_base_url(&self) -> &str {
        &self.watch_base_url
    }

    /// Announce `change` to everyone subscribed right now.
    ///
    /// Each delivery is independent: a failure is logged and the rest still
    /// go out. Recipients that turn out to be unreachable are unsubscribed.
    pub async fn notify(&self, change: &StatusChange) -> DispatchReport {
        let recipients = self.subscribers.snapshot();
        let notifier = &self.notifier;
        let watch_base_url = self.watch_base_url.as_str();

        let outcome = attempt_all(recipients, self.concurrency, |to| {
            let format = notifier.text_format(to);
            let text = format::status_change_message(&change.channel, watch_base_url, format);
            async move { notifier.send(to, &text, format).await }
        })
        .await;

        let mut report = DispatchReport {
            delivered: outcome.succeeded(),
            failed: outcome.failures.len(),
            removed: Vec::new(),
        };

        for failure in outcome.failures {
            let recipient = failure.key;
            match failure.error {
                DeliveryError::Unreachable { reason } => {
                    if self.subscribers.remove(recipient) {
                        info!(
                            %recipient,
                            reason = %reason,
                            "recipient blocked the bot, unsubscribed"
                        );
                        report.removed.push(recipient);
                    }
                },
                e @ DeliveryError::Failed { .. } => {
                    warn!(
                        %recipient,
                        channel = %change.channel.id,
                        error = %e,
                        "failed to deliver status notification"
                    );
                },
            }
        }

        #[cfg(feature = "metrics")]
        {
            counter!(monitor_metrics::NOTIFICATIONS_SENT_TOTAL).increment(report.delivered as u64);
            counter!(monitor_metrics::NOTIFICATION_ERRORS_TOTAL).increment(report.failed as u64);
            counter!(monitor_metrics::SUBSCRIBERS_REMOVED_TOTAL)
                .increment(report.removed.len() as u64);
        }

        debug!(
            channel = %change.channel.id,
            delivered = report.delivered,
            failed = report.failed,
            "status notification dispatched"
        );
        report
    }
}
