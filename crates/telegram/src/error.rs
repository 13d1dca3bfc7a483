use {
    relaydesk_channels::Error as ChannelError,
    relaydesk_common::Identity,
    teloxide::{ApiError, RequestError},
    thiserror::Error,
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] RequestError),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Bot API errors after which `to` can never receive a message again.
fn is_unreachable(error: &ApiError) -> bool {
    matches!(
        error,
        ApiError::BotBlocked
            | ApiError::ChatNotFound
            | ApiError::UserDeactivated
            | ApiError::CantInitiateConversation
            | ApiError::BotKicked
    )
}

/// Classify a failed request addressed to `to` for the routing core.
pub(crate) fn to_channel_error(to: Identity, operation: &str, err: RequestError) -> ChannelError {
    match &err {
        RequestError::Api(api) if is_unreachable(api) => ChannelError::unreachable(to, api),
        RequestError::Api(_) => ChannelError::invalid_input(format!("{operation}: {err}")),
        _ => ChannelError::external(operation, err),
    }
}
