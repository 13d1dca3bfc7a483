use std::time::Duration;

use {
    relaydesk_channels::InboundEvent,
    relaydesk_config::TelegramConfig,
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{Result, handlers};

/// Pause after a failed `getUpdates` before polling again.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Build a bot whose HTTP client outlives the long-polling timeout, so the
/// client never aborts a `getUpdates` before Telegram answers it.
pub fn build_bot(config: &TelegramConfig) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(config.poll_timeout_secs) + 15))
        .build()?;
    Ok(Bot::with_client(config.token.expose_secret(), client))
}

/// Verify the token, clear any webhook and register the user-facing commands.
///
/// Returns the bot's username.
pub async fn connect(bot: &Bot) -> Result<Option<String>> {
    let me = bot.get_me().await?;
    bot.delete_webhook().send().await?;

    let commands = vec![
        BotCommand::new("start", "Start the bot"),
        BotCommand::new("stop", "End the current conversation"),
        BotCommand::new("cancel", "Cancel a pending support request"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?me.username, "telegram bot connected (webhook cleared)");
    Ok(me.username.clone())
}

/// Spawn the long-polling loop. Every usable update is normalized and handed
/// to `on_event`; the loop runs until the returned token is cancelled or
/// Telegram reports another instance polling with the same token.
pub fn spawn_polling<F>(bot: Bot, poll_timeout_secs: u32, on_event: F) -> CancellationToken
where
    F: Fn(InboundEvent) + Send + 'static,
{
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            let request = bot
                .get_updates()
                .offset(offset)
                .timeout(poll_timeout_secs)
                .allowed_updates(vec![AllowedUpdate::Message, AllowedUpdate::CallbackQuery]);

            let result = tokio::select! {
                _ = token.cancelled() => break,
                result = request.send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        if let Some(event) = handlers::to_inbound(update) {
                            on_event(event);
                        }
                    }
                },
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    warn!("telegram polling disabled: another instance is already running with this token");
                    token.cancel();
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        _ = token.cancelled() => break,
                        _ = tokio::time::sleep(POLL_ERROR_BACKOFF) => {},
                    }
                },
            }
        }
        info!("telegram polling stopped");
    });
    cancel
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::MockTelegramApi,
        relaydesk_common::Identity,
        serde_json::json,
        tokio::sync::mpsc,
    };

    #[tokio::test]
    async fn polling_delivers_events_and_advances_offset() {
        let api = MockTelegramApi::start().await;
        api.push_update(json!({
            "update_id": 500,
            "message": {
                "message_id": 3,
                "date": 1,
                "chat": { "id": 42, "type": "private", "first_name": "Alice" },
                "from": { "id": 42, "is_bot": false, "first_name": "Alice" },
                "text": "hello"
            }
        }));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = spawn_polling(api.bot(), 0, move |event| {
            let _ = tx.send(event);
        });

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event before timeout")
            .expect("channel open");
        assert_eq!(event.sender().id, Identity::new(42));

        // The next poll acknowledges update 500.
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let acked = api
                    .requests("GetUpdates")
                    .iter()
                    .any(|body| body["offset"] == json!(501));
                if acked {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("offset advanced");

        cancel.cancel();
        api.shutdown().await;
    }

    #[tokio::test]
    async fn cancelling_stops_polling() {
        let api = MockTelegramApi::start().await;
        let cancel = spawn_polling(api.bot(), 0, |_| {});
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let before = api.requests("GetUpdates").len();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(api.requests("GetUpdates").len(), before);
        api.shutdown().await;
    }
}
