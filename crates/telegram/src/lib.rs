//! Telegram adapter for the relay.
//!
//! Long-polls the Bot API, normalizes updates into
//! [`relaydesk_channels::InboundEvent`]s and implements
//! [`relaydesk_channels::MessagingGateway`] on top of teloxide.

pub mod bot;
pub mod chunk;
pub mod error;
pub mod handlers;
pub mod outbound;

#[cfg(test)]
pub(crate) mod testing;

pub use {
    bot::{build_bot, connect, spawn_polling},
    error::{Error, Result},
    outbound::TelegramGateway,
};
