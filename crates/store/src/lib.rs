//! SQLite persistence for user profiles.

pub mod profiles;

pub use profiles::{SqliteProfileStore, open_pool};
