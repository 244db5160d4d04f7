//! Metric name and label definitions.
//!
//! Every metric recorded anywhere in streamwatch is named here so the set of
//! exported series can be read in one place.

/// VK Video Live API client metrics
pub mod vkvideo {
    /// Client-credentials token exchanges attempted
    pub const TOKEN_EXCHANGES_TOTAL: &str = "streamwatch_vkvideo_token_exchanges_total";
    /// Token exchanges that failed
    pub const TOKEN_EXCHANGE_ERRORS_TOTAL: &str = "streamwatch_vkvideo_token_exchange_errors_total";
    /// Channel status lookups attempted
    pub const CHANNEL_FETCHES_TOTAL: &str = "streamwatch_vkvideo_channel_fetches_total";
    /// Channel status lookups that failed
    pub const CHANNEL_FETCH_ERRORS_TOTAL: &str = "streamwatch_vkvideo_channel_fetch_errors_total";
}

/// Poll cycle and notification metrics
pub mod monitor {
    /// Poll cycles by outcome (idle, completed, aborted, panicked)
    pub const POLL_CYCLES_TOTAL: &str = "streamwatch_poll_cycles_total";
    /// Duration of active poll cycles in seconds
    pub const POLL_CYCLE_DURATION_SECONDS: &str = "streamwatch_poll_cycle_duration_seconds";
    /// Channels whose previous status was kept because the fetch failed
    pub const CHANNELS_RETAINED_TOTAL: &str = "streamwatch_channels_retained_total";
    /// Detected status changes
    pub const STATUS_CHANGES_TOTAL: &str = "streamwatch_status_changes_total";
    /// Current number of subscribers
    pub const SUBSCRIBERS: &str = "streamwatch_subscribers";
    /// Notifications delivered
    pub const NOTIFICATIONS_SENT_TOTAL: &str = "streamwatch_notifications_sent_total";
    /// Notification deliveries that failed
    pub const NOTIFICATION_ERRORS_TOTAL: &str = "streamwatch_notification_errors_total";
    /// Subscribers dropped because they blocked the bot
    pub const SUBSCRIBERS_REMOVED_TOTAL: &str = "streamwatch_subscribers_removed_total";
}

/// Telegram bot metrics
pub mod telegram {
    /// Bot commands received, by command
    pub const COMMANDS_RECEIVED_TOTAL: &str = "streamwatch_telegram_commands_received_total";
    /// Messages sent to Telegram
    pub const MESSAGES_SENT_TOTAL: &str = "streamwatch_telegram_messages_sent_total";
    /// Sends that hit Telegram's flood control
    pub const RATE_LIMITED_TOTAL: &str = "streamwatch_telegram_rate_limited_total";
}

/// Common label keys
pub mod labels {
    pub const OUTCOME: &str = "outcome";
    pub const COMMAND: &str = "command";
}

/// Histogram bucket boundaries
pub mod buckets {
    /// Poll cycles are dominated by one round of parallel HTTP requests.
    pub const POLL_CYCLE_DURATION: [f64; 10] =
        [0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 60.0];
}
