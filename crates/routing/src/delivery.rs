//! Gateway calls with the relay's retry policy: transient failures are
//! retried once, permanent ones surface immediately.

use std::future::Future;

use {
    relaydesk_channels::{MessagingGateway, SendOptions},
    relaydesk_common::{Identity, MessageRef},
    tracing::warn,
};

use crate::Result;

pub(crate) async fn retry_once<T, F, Fut>(operation: &'static str, to: Identity, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = relaydesk_channels::Result<T>>,
{
    match call().await {
        Ok(value) => Ok(value),
        Err(err) if err.is_permanent() => Err(err.into()),
        Err(err) => {
            warn!(operation, to = %to, error = %err, "gateway call failed, retrying once");
            Ok(call().await?)
        },
    }
}

pub async fn send(
    gateway: &dyn MessagingGateway,
    to: Identity,
    text: &str,
    options: SendOptions,
) -> Result<MessageRef> {
    retry_once("send message", to, || {
        gateway.send_message(to, text, options.clone())
    })
    .await
}

pub async fn forward(
    gateway: &dyn MessagingGateway,
    to: Identity,
    from: Identity,
    message: MessageRef,
) -> Result<MessageRef> {
    retry_once("forward message", to, || {
        gateway.forward_message(to, from, message)
    })
    .await
}

pub async fn copy(
    gateway: &dyn MessagingGateway,
    to: Identity,
    from: Identity,
    message: MessageRef,
) -> Result<MessageRef> {
    retry_once("copy message", to, || gateway.copy_message(to, from, message)).await
}
