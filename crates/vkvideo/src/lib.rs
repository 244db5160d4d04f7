//! Client for the VK Video Live API.
//!
//! Obtains server-to-server access tokens with the client-credentials grant
//! and looks up the live status of individual channels.

pub mod client;
pub mod config;
pub mod error;
pub mod token;
pub mod types;

pub use {
    client::VkVideoClient,
    config::VkVideoConfig,
    error::{Error, Result},
    token::TokenManager,
    types::{Channel, StreamStatus},
};
