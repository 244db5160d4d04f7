//! Change detection between two status snapshots.

use streamwatch_vkvideo::{Channel, StreamStatus};

use crate::registry::Snapshot;

/// A channel whose status differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub old_status: StreamStatus,
    /// The channel as it is now.
    pub channel: Channel,
}

impl StatusChange {
    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.channel.id
    }

    #[must_use]
    pub fn new_status(&self) -> &StreamStatus {
        &self.channel.status
    }
}

/// Channels present in both snapshots whose status differs, in `new`'s order.
///
/// Channels missing from `old` have no baseline and are never reported, so
/// the first poll after startup announces nothing.
#[must_use]
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<StatusChange> {
    new.entries()
        .filter_map(|(id, current)| {
            let previous = old.get(id)?;
            (previous.status != current.status).then(|| StatusChange {
                old_status: previous.status.clone(),
                channel: current.clone(),
            })
        })
        .collect()
}
