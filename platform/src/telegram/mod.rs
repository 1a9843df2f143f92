//! Telegram Bot API backend.

pub mod client;
pub mod poller;
pub mod wire;

pub use client::{TelegramClient, TelegramConfig, DEFAULT_API_URL};
pub use poller::UpdatePoller;
