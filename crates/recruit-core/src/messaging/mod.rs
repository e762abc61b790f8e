//! Outbound chat boundary (Telegram today).

pub mod port;
