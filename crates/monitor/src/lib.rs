//! Live-status monitoring for a fixed set of VK Video channels.
//!
//! A [`scheduler::PollScheduler`] periodically asks the
//! [`service::MonitorService`] to run one cycle: refresh every tracked channel
//! concurrently through the [`registry::StatusRegistry`], compare the previous
//! and new snapshots with [`diff::diff`], and hand each change to the
//! [`dispatch::Dispatcher`], which fans the announcement out to every
//! subscriber in the [`subscribers::SubscriberSet`].

pub mod diff;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod subscribers;
pub mod tracked;

#[cfg(test)]
mod test_support;

pub use {
    diff::{StatusChange, diff},
    dispatch::{DispatchReport, Dispatcher, Notifier},
    error::{ConfigError, DeliveryError, Error, Result},
    format::TextFormat,
    registry::{ChannelSource, Refresh, Snapshot, StatusRegistry},
    scheduler::{PollScheduler, SchedulerConfig},
    service::{CycleOutcome, MonitorService},
    subscribers::{RecipientId, SubscriberSet},
    tracked::TrackedChannels,
};
