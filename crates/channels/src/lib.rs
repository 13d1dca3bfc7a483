//! Collaborator seams around the relay core.
//!
//! The messaging gateway (send/forward/copy/delete plus inbound events), the
//! profile store and the user directory are all traits here so the routing
//! engine never depends on a concrete transport or database.

pub mod error;
pub mod event;
pub mod gateway;
pub mod profile;

pub use {
    error::{Error, Result},
    event::InboundEvent,
    gateway::{Button, ButtonTarget, Keyboard, MessagingGateway, SendOptions, TextFormat},
    profile::{ForwardRecord, MemoryProfileStore, ProfileStore, ProfileUpdate, UserDirectory, UserProfile},
};
