//! Shared types, error definitions, and utilities used across all relaydesk crates.

pub mod error;
pub mod types;

pub use {
    error::{Error, FromMessage},
    types::{Identity, MessageRef, Participant},
};
