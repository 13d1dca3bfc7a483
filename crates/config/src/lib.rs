//! Configuration loading, env substitution, environment overrides and validation.
//!
//! Config files: `relaydesk.toml`, `relaydesk.yaml`, or `relaydesk.json`
//! Searched in `./` then `~/.config/relaydesk/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in the raw file.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod template;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{RelayConfig, RelaySettings, ServerConfig, StoreConfig, TelegramConfig},
    template::default_config_template,
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
