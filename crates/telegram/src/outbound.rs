use {
    async_trait::async_trait,
    std::{future::Future, time::Duration},
    teloxide::{
        ApiError, RequestError,
        payloads::{AnswerCallbackQuerySetters, SendMessageSetters},
        prelude::*,
        types::{
            ChatId, InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup,
            KeyboardRemove, MessageId, ParseMode, ReplyMarkup,
        },
    },
    tracing::{debug, warn},
};

use {
    relaydesk_channels::{
        ButtonTarget, Error as ChannelError, Keyboard, MessagingGateway, Result, SendOptions,
        TextFormat,
    },
    relaydesk_common::{Identity, MessageRef},
};

use crate::{
    chunk::{TELEGRAM_MAX_MESSAGE_LEN, chunk_message},
    error::to_channel_error,
};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// [`MessagingGateway`] backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Run `request`, sleeping through `RetryAfter` responses a bounded
    /// number of times.
    async fn run_request_with_retry<T, F, Fut>(
        &self,
        to: Identity,
        operation: &'static str,
        mut request: F,
    ) -> std::result::Result<T, RequestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, RequestError>>,
    {
        let mut retries = 0usize;

        loop {
            match request().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let Some(wait) = retry_after_duration(&err) else {
                        return Err(err);
                    };

                    if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                        warn!(
                            chat_id = %to,
                            operation,
                            retries,
                            retry_after_secs = wait.as_secs(),
                            "telegram rate limit persisted after retries"
                        );
                        return Err(err);
                    }

                    retries += 1;
                    warn!(
                        chat_id = %to,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limited, waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                },
            }
        }
    }

    async fn send_chunk(
        &self,
        to: Identity,
        chunk: &str,
        format: TextFormat,
        markup: Option<&ReplyMarkup>,
    ) -> Result<MessageRef> {
        let chat_id = ChatId(to.get());
        let send = |html: bool| {
            self.run_request_with_retry(to, "send message", move || {
                let mut req = self.bot.send_message(chat_id, chunk);
                if html {
                    req = req.parse_mode(ParseMode::Html);
                }
                if let Some(markup) = markup {
                    req = req.reply_markup(markup.clone());
                }
                async move { req.await }
            })
        };

        let html = format == TextFormat::Html;
        match send(html).await {
            Ok(message) => Ok(MessageRef(message.id.0)),
            Err(RequestError::Api(ApiError::CantParseEntities(reason))) if html => {
                warn!(chat_id = %to, reason = %reason, "telegram rejected HTML, retrying as plain text");
                send(false)
                    .await
                    .map(|message| MessageRef(message.id.0))
                    .map_err(|e| to_channel_error(to, "send message", e))
            },
            Err(e) => Err(to_channel_error(to, "send message", e)),
        }
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_message(
        &self,
        to: Identity,
        text: &str,
        options: SendOptions,
    ) -> Result<MessageRef> {
        let markup = options.keyboard.as_ref().map(reply_markup).transpose()?;
        let chunks = chunk_message(text, TELEGRAM_MAX_MESSAGE_LEN);
        let last = chunks.len().saturating_sub(1);

        let mut sent = None;
        for (i, chunk) in chunks.iter().enumerate() {
            // The keyboard belongs under the final part.
            let markup = if i == last { markup.as_ref() } else { None };
            sent = Some(self.send_chunk(to, chunk, options.format, markup).await?);
        }
        debug!(chat_id = %to, chunks = chunks.len(), "telegram message sent");
        sent.ok_or_else(|| ChannelError::invalid_input("empty message"))
    }

    async fn forward_message(
        &self,
        to: Identity,
        from: Identity,
        message: MessageRef,
    ) -> Result<MessageRef> {
        let forwarded = self
            .run_request_with_retry(to, "forward message", || {
                let req =
                    self.bot
                        .forward_message(ChatId(to.get()), ChatId(from.get()), MessageId(message.0));
                async move { req.await }
            })
            .await
            .map_err(|e| to_channel_error(to, "forward message", e))?;
        Ok(MessageRef(forwarded.id.0))
    }

    async fn copy_message(
        &self,
        to: Identity,
        from: Identity,
        message: MessageRef,
    ) -> Result<MessageRef> {
        let copied = self
            .run_request_with_retry(to, "copy message", || {
                let req =
                    self.bot
                        .copy_message(ChatId(to.get()), ChatId(from.get()), MessageId(message.0));
                async move { req.await }
            })
            .await
            .map_err(|e| to_channel_error(to, "copy message", e))?;
        Ok(MessageRef(copied.0))
    }

    async fn delete_message(&self, chat: Identity, message: MessageRef) -> Result<()> {
        self.run_request_with_retry(chat, "delete message", || {
            let req = self
                .bot
                .delete_message(ChatId(chat.get()), MessageId(message.0));
            async move { req.await }
        })
        .await
        .map_err(|e| to_channel_error(chat, "delete message", e))?;
        Ok(())
    }

    async fn answer_action(&self, action_id: &str, text: Option<&str>) -> Result<()> {
        let mut req = self.bot.answer_callback_query(action_id.to_string());
        if let Some(text) = text {
            req = req.text(text.to_string());
        }
        req.await
            .map_err(|e| ChannelError::external("answer callback query", e))?;
        Ok(())
    }
}

fn reply_markup(keyboard: &Keyboard) -> Result<ReplyMarkup> {
    Ok(match keyboard {
        Keyboard::Inline(rows) => {
            let rows = rows
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| match &button.target {
                            ButtonTarget::Action(payload) => Ok(InlineKeyboardButton::callback(
                                button.label.clone(),
                                payload.clone(),
                            )),
                            ButtonTarget::Url(url) => reqwest::Url::parse(url)
                                .map(|url| InlineKeyboardButton::url(button.label.clone(), url))
                                .map_err(|e| {
                                    ChannelError::invalid_input(format!("button url {url:?}: {e}"))
                                }),
                        })
                        .collect::<Result<Vec<_>>>()
                })
                .collect::<Result<Vec<_>>>()?;
            ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(rows))
        },
        Keyboard::Reply { rows, one_time } => {
            let rows = rows
                .iter()
                .map(|row| row.iter().map(KeyboardButton::new).collect::<Vec<_>>());
            let mut markup = KeyboardMarkup::new(rows).resize_keyboard();
            if *one_time {
                markup = markup.one_time_keyboard();
            }
            ReplyMarkup::Keyboard(markup)
        },
        Keyboard::RemoveReply => ReplyMarkup::KeyboardRemove(KeyboardRemove::new()),
    })
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}
