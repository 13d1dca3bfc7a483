//! Documented starter config written by `relaydesk config init`.

/// Generate the default config template with a specific liveness port.
pub fn default_config_template(port: u16) -> String {
    format!(
        r##"# Relaydesk Configuration
# =======================
# Every option is listed with its default. Changes require a restart.
#
# Environment variable substitution is supported: ${{ENV_VAR}}
# TELEGRAM_BOT_TOKEN, RELAYDESK_AGENTS, ADMIN_CHAT_ID_1/_2, PORT and
# RELAYDESK_DATABASE_URL override the values below.

# Chat ids of the support agents. Agents receive support requests and may
# run /ban, /unban, /banned and /broadcast.
agents = []

[telegram]
token = "${{TELEGRAM_BOT_TOKEN:-}}"
poll_timeout_secs = 30                 # getUpdates long-polling timeout

[relay]
legacy_stop_keyword = false            # accept the plain text "Stop Conversation"
auto_reply_cooldown_secs = 900         # min seconds between offline auto-replies
timezone = "Asia/Dhaka"                # time zone for the greeting
default_language = "en"                # "en" or "bn"
# channel_url = "https://t.me/yourchannel"
# support_url = "https://t.me/yourgroup"

[server]
enabled = true                         # GET / liveness endpoint
bind = "0.0.0.0"
port = {port}

[store]
database_url = "sqlite://relaydesk.db?mode=rwc"
"##
    )
}
