//! Per-identity event lanes.
//!
//! Each sender gets its own FIFO lane served by one task, so events from the
//! same identity are handled strictly in arrival order while different
//! identities proceed concurrently. Idle lanes retire themselves.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use {
    async_trait::async_trait,
    relaydesk_channels::InboundEvent,
    relaydesk_common::Identity,
    tokio::sync::mpsc,
    tracing::{debug, trace},
};

/// How long an empty lane waits before its task exits.
pub const DEFAULT_LANE_IDLE: Duration = Duration::from_secs(60);

/// Consumer of ordered inbound events.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: InboundEvent);
}

type LaneMap = HashMap<Identity, mpsc::UnboundedSender<InboundEvent>>;

pub struct EventLanes {
    lanes: Arc<Mutex<LaneMap>>,
    handler: Arc<dyn EventHandler>,
    idle: Duration,
}

impl EventLanes {
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self::with_idle_timeout(handler, DEFAULT_LANE_IDLE)
    }

    pub fn with_idle_timeout(handler: Arc<dyn EventHandler>, idle: Duration) -> Self {
        Self {
            lanes: Arc::new(Mutex::new(HashMap::new())),
            handler,
            idle,
        }
    }

    /// Queue `event` on its sender's lane, starting the lane if needed.
    /// Must be called from within a Tokio runtime.
    pub fn submit(&self, event: InboundEvent) {
        let key = event.sender().id;
        let mut lanes = lock(&self.lanes);

        let event = match lanes.get(&key) {
            Some(tx) => match tx.send(event) {
                Ok(()) => return,
                // The lane task is gone without deregistering (it panicked).
                Err(mpsc::error::SendError(event)) => event,
            },
            None => event,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(event).is_err() {
            return;
        }
        lanes.insert(key, tx);
        drop(lanes);

        trace!(identity = %key, "lane started");
        tokio::spawn(run_lane(
            key,
            rx,
            Arc::clone(&self.lanes),
            Arc::clone(&self.handler),
            self.idle,
        ));
    }

    /// Number of lanes with a live task.
    pub fn active_lanes(&self) -> usize {
        lock(&self.lanes).len()
    }
}

fn lock(lanes: &Mutex<LaneMap>) -> MutexGuard<'_, LaneMap> {
    lanes.lock().unwrap_or_else(|e| e.into_inner())
}

async fn run_lane(
    key: Identity,
    mut rx: mpsc::UnboundedReceiver<InboundEvent>,
    lanes: Arc<Mutex<LaneMap>>,
    handler: Arc<dyn EventHandler>,
    idle: Duration,
) {
    loop {
        let event = match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => match retire(key, &mut rx, &lanes) {
                Some(event) => event,
                None => break,
            },
        };
        handler.handle(event).await;
    }
    debug!(identity = %key, "lane retired");
}

/// Deregister an idle lane. Submitters hold the same lock, so either an event
/// slipped in (returned, lane keeps running) or nothing can reach `rx` again.
fn retire(
    key: Identity,
    rx: &mut mpsc::UnboundedReceiver<InboundEvent>,
    lanes: &Mutex<LaneMap>,
) -> Option<InboundEvent> {
    let mut lanes = lock(lanes);
    match rx.try_recv() {
        Ok(event) => Some(event),
        Err(_) => {
            lanes.remove(&key);
            None
        },
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        relaydesk_common::{MessageRef, Participant},
        tokio::sync::{Notify, mpsc::UnboundedSender},
    };

    struct Recorder {
        seen: UnboundedSender<(i64, String)>,
        gate: Option<(i64, Arc<Notify>)>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: InboundEvent) {
            let id = event.sender().id.get();
            if let Some((blocked, gate)) = &self.gate {
                if *blocked == id {
                    gate.notified().await;
                }
            }
            let text = match event {
                InboundEvent::Message { text, .. } => text.unwrap_or_default(),
                _ => String::new(),
            };
            let _ = self.seen.send((id, text));
        }
    }

    fn message(from: i64, text: &str) -> InboundEvent {
        InboundEvent::Message {
            from: Participant::new(from, "T"),
            text: Some(text.into()),
            message: MessageRef(1),
        }
    }

    #[tokio::test]
    async fn events_from_one_sender_stay_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let lanes = EventLanes::new(Arc::new(Recorder {
            seen: tx,
            gate: None,
        }));

        for n in 0..20 {
            lanes.submit(message(1, &n.to_string()));
        }
        for n in 0..20 {
            assert_eq!(rx.recv().await.unwrap(), (1, n.to_string()));
        }
        assert_eq!(lanes.active_lanes(), 1);
    }

    #[tokio::test]
    async fn blocked_sender_does_not_stall_others() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let gate = Arc::new(Notify::new());
        let lanes = EventLanes::new(Arc::new(Recorder {
            seen: tx,
            gate: Some((1, gate.clone())),
        }));

        lanes.submit(message(1, "slow"));
        lanes.submit(message(2, "fast"));
        assert_eq!(rx.recv().await.unwrap(), (2, "fast".to_string()));

        gate.notify_one();
        assert_eq!(rx.recv().await.unwrap(), (1, "slow".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_lanes_retire_and_restart() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let lanes = EventLanes::with_idle_timeout(
            Arc::new(Recorder {
                seen: tx,
                gate: None,
            }),
            Duration::from_secs(5),
        );

        lanes.submit(message(1, "a"));
        assert_eq!(rx.recv().await.unwrap().1, "a");

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(lanes.active_lanes(), 0);

        lanes.submit(message(1, "b"));
        assert_eq!(rx.recv().await.unwrap().1, "b");
        assert_eq!(lanes.active_lanes(), 1);
    }
}
