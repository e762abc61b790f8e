//! Core of the clan recruitment bot: the application lifecycle, admin review
//! claims and the persistence and messaging ports they run behind.
//!
//! Framework-agnostic. Telegram lives in an adapter crate implementing
//! [`messaging::port::MessagingPort`].

pub mod config;
pub mod domain;
pub mod errors;
pub mod formatting;
pub mod logging;
pub mod messaging;
pub mod ports;
pub mod security;
pub mod services;
pub mod storage;

#[cfg(test)]
mod testing;

pub use errors::{Error, Result};
