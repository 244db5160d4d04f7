//! Shared error type and small async utilities used across streamwatch crates.

pub mod error;
pub mod fanout;
pub mod retry;

pub use error::{Error, Result};
