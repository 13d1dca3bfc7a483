//! Semantic validation of a loaded [`RelayConfig`].
//!
//! Errors prevent startup; warnings are logged and the relay keeps running.

use {relaydesk_common::Identity, secrecy::ExposeSecret};

use crate::schema::RelayConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "telegram.token"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Validate a fully resolved config (file + environment).
pub fn validate(config: &RelayConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let token = config.telegram.token.expose_secret();
    if token.trim().is_empty() {
        result.push(
            Severity::Error,
            "telegram.token",
            "bot token is required (set TELEGRAM_BOT_TOKEN)",
        );
    } else if !token.contains(':') {
        result.push(
            Severity::Warning,
            "telegram.token",
            "token does not look like a BotFather token (<id>:<secret>)",
        );
    }

    if config.agents.is_empty() {
        result.push(
            Severity::Error,
            "agents",
            "at least one agent id is required (set RELAYDESK_AGENTS)",
        );
    }

    let mut seen: Vec<Identity> = Vec::with_capacity(config.agents.len());
    for agent in &config.agents {
        if seen.contains(agent) {
            result.push(Severity::Warning, "agents", format!("duplicate agent id {agent}"));
        } else {
            seen.push(*agent);
        }
    }

    if !matches!(config.relay.default_language.as_str(), "en" | "bn") {
        result.push(
            Severity::Warning,
            "relay.default_language",
            format!(
                "unknown language {:?}, falling back to \"en\"",
                config.relay.default_language
            ),
        );
    }

    if config.relay.auto_reply_cooldown_secs == 0 {
        result.push(
            Severity::Warning,
            "relay.auto_reply_cooldown_secs",
            "a zero cooldown auto-replies to every message",
        );
    }

    for (path, url) in [
        ("relay.channel_url", &config.relay.channel_url),
        ("relay.support_url", &config.relay.support_url),
    ] {
        if let Some(url) = url
            && !(url.starts_with("https://") || url.starts_with("tg://"))
        {
            result.push(
                Severity::Warning,
                path,
                "Telegram only accepts https:// or tg:// button links",
            );
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn valid() -> RelayConfig {
        let mut cfg = RelayConfig::default();
        cfg.telegram.token = Secret::new("1:abc".into());
        cfg.agents = vec![Identity::new(1)];
        cfg
    }

    #[test]
    fn valid_config_has_no_diagnostics() {
        assert!(validate(&valid()).diagnostics.is_empty());
    }

    #[test]
    fn missing_token_and_agents_are_errors() {
        let result = validate(&RelayConfig::default());
        assert!(result.has_errors());
        let paths: Vec<_> = result.diagnostics.iter().map(|d| d.path.as_str()).collect();
        assert!(paths.contains(&"telegram.token"));
        assert!(paths.contains(&"agents"));
    }

    #[test]
    fn duplicate_agent_is_warning_only() {
        let mut cfg = valid();
        cfg.agents.push(Identity::new(1));
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn http_button_link_warns() {
        let mut cfg = valid();
        cfg.relay.channel_url = Some("http://t.me/x".into());
        let result = validate(&cfg);
        assert_eq!(result.diagnostics[0].path, "relay.channel_url");
    }
}
