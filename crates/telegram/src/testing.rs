//! In-process stand-in for the Bot API, served by axum on a loopback port.

use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    axum::{Json, Router, body::Bytes, extract::State, http::Uri, routing::post},
    serde_json::{Value, json},
    tokio::{sync::oneshot, task::JoinHandle},
};

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
    blocked: Arc<Mutex<HashSet<i64>>>,
    updates: Arc<Mutex<VecDeque<Value>>>,
}

pub(crate) struct MockTelegramApi {
    state: MockState,
    bot: teloxide::Bot,
    shutdown: Option<oneshot::Sender<()>>,
    server: JoinHandle<()>,
}

#[allow(clippy::expect_used)]
impl MockTelegramApi {
    pub(crate) async fn start() -> Self {
        let state = MockState::default();
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });

        let api_url = reqwest::Url::parse(&format!("http://{addr}/")).expect("parse api url");
        let bot = teloxide::Bot::new("test-token").set_api_url(api_url);
        Self {
            state,
            bot,
            shutdown: Some(shutdown_tx),
            server,
        }
    }

    pub(crate) fn bot(&self) -> teloxide::Bot {
        self.bot.clone()
    }

    /// JSON bodies received for `method`, in arrival order.
    pub(crate) fn requests(&self, method: &str) -> Vec<Value> {
        self.state
            .requests
            .lock()
            .expect("lock requests")
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// Answer every request addressed to `chat_id` as if the user blocked the bot.
    pub(crate) fn block_chat(&self, chat_id: i64) {
        self.state
            .blocked
            .lock()
            .expect("lock blocked")
            .insert(chat_id);
    }

    /// Queue a raw update for the next `getUpdates` call.
    pub(crate) fn push_update(&self, update: Value) {
        self.state
            .updates
            .lock()
            .expect("lock updates")
            .push_back(update);
    }

    pub(crate) async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.server.await;
    }
}

async fn telegram_api_handler(
    State(state): State<MockState>,
    uri: Uri,
    body: Bytes,
) -> Json<Value> {
    let method = uri.path().rsplit('/').next().unwrap_or_default().to_string();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state
        .requests
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push((method.clone(), body.clone()));

    let chat_id = body["chat_id"].as_i64().unwrap_or_default();
    let blocked = state
        .blocked
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .contains(&chat_id);
    if blocked {
        return Json(json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user",
        }));
    }

    let result = match method.as_str() {
        "SendMessage" | "ForwardMessage" => json!({
            "message_id": 1,
            "date": 0,
            "chat": { "id": chat_id, "type": "private" },
            "text": "ok",
        }),
        "CopyMessage" => json!({ "message_id": 77 }),
        "GetUpdates" => {
            let queued: Vec<Value> = state
                .updates
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .drain(..)
                .collect();
            if queued.is_empty() {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Value::Array(queued)
        },
        _ => json!(true),
    };
    Json(json!({ "ok": true, "result": result }))
}
