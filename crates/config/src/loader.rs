use std::path::{Path, PathBuf};

use {
    relaydesk_common::Identity,
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{
    Error, Result,
    error::Context,
    env_subst::substitute_env,
    schema::RelayConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "relaydesk.toml",
    "relaydesk.yaml",
    "relaydesk.yml",
    "relaydesk.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<RelayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply environment
/// overrides.
///
/// Search order:
/// 1. `./relaydesk.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/relaydesk/relaydesk.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `RelayConfig::default()` when no file is found, which is the
/// usual case for container deployments configured purely by environment.
pub fn discover_and_load(explicit: Option<&Path>) -> Result<RelayConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };

    let mut config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)?
        },
        None => {
            debug!("no config file found, using defaults");
            RelayConfig::default()
        },
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/relaydesk/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "relaydesk").map(|d| d.config_dir().to_path_buf())
}

/// Apply process environment overrides on top of a loaded config.
///
/// | variable                  | effect                                |
/// |---------------------------|---------------------------------------|
/// | `TELEGRAM_BOT_TOKEN`      | bot token                             |
/// | `RELAYDESK_AGENTS`        | comma-separated agent pool (replaces) |
/// | `ADMIN_CHAT_ID_1`, `_2`   | appended to the agent pool            |
/// | `PORT`                    | liveness endpoint port                |
/// | `RELAYDESK_DATABASE_URL`  | profile store URL                     |
pub fn apply_env_overrides(config: &mut RelayConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

pub(crate) fn apply_env_overrides_with(
    config: &mut RelayConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
        config.telegram.token = Secret::new(token.trim().to_string());
    }

    if let Some(list) = get("RELAYDESK_AGENTS") {
        let mut agents = Vec::new();
        for entry in list.split(',').filter(|e| !e.trim().is_empty()) {
            match entry.parse::<Identity>() {
                Ok(id) => agents.push(id),
                Err(e) => warn!(entry, error = %e, "ignoring invalid agent id in RELAYDESK_AGENTS"),
            }
        }
        config.agents = agents;
    }

    for var in ["ADMIN_CHAT_ID_1", "ADMIN_CHAT_ID_2"] {
        let Some(raw) = get(var) else { continue };
        match raw.parse::<Identity>() {
            Ok(id) if !config.agents.contains(&id) => config.agents.push(id),
            Ok(_) => {},
            Err(e) => warn!(var, error = %e, "ignoring invalid agent id"),
        }
    }

    if let Some(port) = get("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(port, error = %e, "ignoring invalid PORT"),
        }
    }

    if let Some(url) = get("RELAYDESK_DATABASE_URL") {
        config.store.database_url = url;
    }
}

fn parse_config(raw: &str, path: &Path) -> Result<RelayConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}
