//! Process wiring: profile store, Telegram adapter, relay, event lanes and
//! the liveness endpoint.

use std::{net::SocketAddr, sync::Arc};

use {
    anyhow::{Context, Result, bail},
    axum::{Router, routing::get},
    relaydesk_channels::ProfileStore,
    relaydesk_config::{RelayConfig, Severity, validate},
    relaydesk_routing::{AgentPool, EventLanes, Relay},
    relaydesk_store::{SqliteProfileStore, open_pool},
    relaydesk_telegram::{TelegramGateway, build_bot, connect, spawn_polling},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

pub async fn run(config: RelayConfig) -> Result<()> {
    let report = validate(&config);
    for d in &report.diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
        }
    }
    if report.has_errors() {
        bail!("invalid configuration");
    }

    let pool = open_pool(&config.store.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.store.database_url))?;
    SqliteProfileStore::init(&pool)
        .await
        .context("failed to init profiles table")?;
    let store = Arc::new(SqliteProfileStore::new(pool));

    let bot = build_bot(&config.telegram)?;
    connect(&bot).await?;

    let agents = AgentPool::new(config.agents.iter().copied());
    info!(agents = agents.len(), "relay starting");
    let relay = Arc::new(Relay::new(
        Arc::new(TelegramGateway::new(bot.clone())),
        Arc::clone(&store) as Arc<dyn ProfileStore>,
        store,
        agents,
        config.relay.clone(),
    ));
    let lanes = EventLanes::new(relay);
    let polling = spawn_polling(bot, config.telegram.poll_timeout_secs, move |event| {
        lanes.submit(event);
    });

    let shutdown = CancellationToken::new();
    let server = if config.server.enabled {
        let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
            .parse()
            .with_context(|| format!("invalid bind address {}", config.server.bind))?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        info!(%addr, "liveness endpoint listening");
        Some(tokio::spawn(serve_liveness(listener, shutdown.clone())))
    } else {
        None
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for ctrl-c")?;
            info!("shutting down");
        },
        _ = polling.cancelled() => {
            warn!("telegram polling ended, shutting down");
        },
    }
    polling.cancel();
    shutdown.cancel();
    if let Some(server) = server {
        server.await??;
    }
    Ok(())
}

fn liveness_router() -> Router {
    Router::new().route("/", get(|| async { "running" }))
}

async fn serve_liveness(listener: tokio::net::TcpListener, shutdown: CancellationToken) -> Result<()> {
    axum::serve(listener, liveness_router())
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn liveness_answers_and_shuts_down() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = tokio::spawn(serve_liveness(listener, shutdown.clone()));

        let body = reqwest::get(format!("http://{addr}/"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "running");

        shutdown.cancel();
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn missing_token_and_agents_refuse_to_start() {
        let err = run(RelayConfig::default()).await.unwrap_err();
        assert!(err.to_string().contains("invalid configuration"));
    }
}
