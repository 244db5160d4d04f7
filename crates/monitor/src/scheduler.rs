//! Fixed-interval driver for [`MonitorService::run_cycle`].

use std::{sync::Arc, time::Duration};

use {
    tokio::{
        task::JoinHandle,
        time::{Instant, MissedTickBehavior, interval_at},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info},
};

#[cfg(feature = "metrics")]
use streamwatch_metrics::{counter, labels, monitor as monitor_metrics};

use crate::service::{CycleOutcome, MonitorService};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    /// Delay before the first cycle after startup.
    pub initial_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }
}

/// Runs one cycle per tick until cancelled.
///
/// At most one cycle is in flight. A cycle that outlasts the interval makes
/// the scheduler skip the ticks it missed rather than queueing them. A cycle
/// that fails or panics is logged and the next tick proceeds normally.
pub struct PollScheduler {
    service: Arc<MonitorService>,
    config: SchedulerConfig,
}

impl PollScheduler {
    pub fn new(service: Arc<MonitorService>, config: SchedulerConfig) -> Self {
        Self { service, config }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    pub async fn run(self, cancel: CancellationToken) {
        let period = self.config.interval.max(Duration::from_millis(1));
        let mut ticker = interval_at(Instant::now() + self.config.initial_delay, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = period.as_secs(),
            initial_delay_secs = self.config.initial_delay.as_secs(),
            "poll scheduler started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {},
            }

            let service = Arc::clone(&self.service);
            let mut cycle = tokio::spawn(async move { service.run_cycle().await });

            tokio::select! {
                () = cancel.cancelled() => {
                    cycle.abort();
                    break;
                },
                joined = &mut cycle => match joined {
                    Ok(Ok(CycleOutcome::Idle)) => debug!("poll cycle idle"),
                    Ok(Ok(CycleOutcome::Completed { .. })) => {},
                    Ok(Err(e)) => error!(error = %e, "poll cycle aborted"),
                    Err(e) => {
                        error!(error = %e, "poll cycle panicked");
                        #[cfg(feature = "metrics")]
                        counter!(monitor_metrics::POLL_CYCLES_TOTAL, labels::OUTCOME => "panicked")
                            .increment(1);
                    },
                },
            }
        }

        info!("poll scheduler stopped");
    }
}
