//! Telegram front end for streamwatch.
//!
//! Receives subscriber commands by long polling with teloxide and delivers
//! status announcements through [`outbound::TelegramOutbound`], which
//! implements the monitor's `Notifier`.

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod outbound;

pub use {
    bot::{TelegramBot, connect},
    config::TelegramConfig,
    error::{Error, Result},
    handlers::Command,
    outbound::TelegramOutbound,
};
