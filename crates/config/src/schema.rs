/// Config schema types (telegram, agents, relay behaviour, server, store).
use {
    chrono_tz::Tz,
    relaydesk_common::Identity,
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub telegram: TelegramConfig,
    /// The agent pool. Fixed for the lifetime of the process.
    pub agents: Vec<Identity>,
    pub relay: RelaySettings,
    pub server: ServerConfig,
    pub store: StoreConfig,
}

/// Telegram bot credentials and polling behaviour.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,

    /// Long-polling timeout passed to `getUpdates` (seconds).
    pub poll_timeout_secs: u32,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: 30,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Relay behaviour knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Treat the plain text "stop conversation" as a session stop, and show
    /// agents the matching reply keyboard.
    pub legacy_stop_keyword: bool,

    /// Minimum interval between automatic replies to users writing outside
    /// a session (seconds).
    pub auto_reply_cooldown_secs: u64,

    /// Time zone used for the greeting.
    pub timezone: Tz,

    /// "Join our channel" link shown in the main menu.
    pub channel_url: Option<String>,

    /// Support group link mentioned in the automatic reply.
    pub support_url: Option<String>,

    /// Language code used before a user picks one (`en` or `bn`).
    pub default_language: String,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            legacy_stop_keyword: false,
            auto_reply_cooldown_secs: 15 * 60,
            timezone: chrono_tz::Asia::Dhaka,
            channel_url: None,
            support_url: None,
            default_language: "en".into(),
        }
    }
}

/// Liveness endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0".into(),
            port: 3000,
        }
    }
}

/// Profile store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite URL. `sqlite::memory:` keeps profiles in memory only.
    pub database_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://relaydesk.db?mode=rwc".into(),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = RelayConfig::default();
        assert!(cfg.agents.is_empty());
        assert!(!cfg.relay.legacy_stop_keyword);
        assert_eq!(cfg.relay.auto_reply_cooldown_secs, 900);
        assert_eq!(cfg.relay.timezone, chrono_tz::Asia::Dhaka);
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.telegram.poll_timeout_secs, 30);
    }

    #[test]
    fn deserialize_from_toml() {
        let raw = r#"
            agents = [111, 222]

            [telegram]
            token = "123:ABC"

            [relay]
            legacy_stop_keyword = true
            timezone = "Europe/Berlin"
            channel_url = "https://t.me/example"
        "#;
        let cfg: RelayConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.telegram.token.expose_secret(), "123:ABC");
        assert_eq!(cfg.agents, vec![Identity::new(111), Identity::new(222)]);
        assert!(cfg.relay.legacy_stop_keyword);
        assert_eq!(cfg.relay.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(cfg.relay.channel_url.as_deref(), Some("https://t.me/example"));
        // defaults for unspecified fields
        assert_eq!(cfg.relay.auto_reply_cooldown_secs, 900);
        assert!(cfg.server.enabled);
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = TelegramConfig {
            token: Secret::new("123:SECRET".into()),
            ..Default::default()
        };
        let out = format!("{cfg:?}");
        assert!(!out.contains("SECRET"));
        assert!(out.contains("[REDACTED]"));
    }

    #[test]
    fn serialize_roundtrip_keeps_token() {
        let mut cfg = RelayConfig::default();
        cfg.telegram.token = Secret::new("tok".into());
        let json = serde_json::to_string(&cfg).unwrap();
        let back: RelayConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.telegram.token.expose_secret(), "tok");
    }
}
