//! Live-Update Bus (spec.md §4.7): an in-process registry of streaming
//! client handles, fanned out from the broker's `job_updates` topic.
//!
//! Grounded on `original_source/app/services/websocket_manager.py`'s
//! `active_connections: Dict[str, List[WebSocket]]` +
//! `broadcast_to_job` (`asyncio.gather(..., return_exceptions=True)`), and on
//! spec.md §9's back-pressure rule ("drop a message to a slow client after
//! logging rather than stalling the bus").

use std::collections::HashMap;
use std::sync::Arc;

use confab_broker::Subscriber;
use tokio::sync::{Mutex, mpsc};

/// Bounded so one stalled client can never make the broadcaster block; a
/// full channel just drops the message for that one handle (spec.md §9).
const HANDLE_BUFFER: usize = 32;

pub type Envelope = serde_json::Value;

#[derive(Clone)]
pub struct Bus {
    handles: Arc<Mutex<HashMap<String, Vec<mpsc::Sender<Envelope>>>>>,
}

pub struct Registration {
    request_id: String,
    bus: Bus,
    pub receiver: mpsc::Receiver<Envelope>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let bus = self.bus.clone();
        let request_id = std::mem::take(&mut self.request_id);
        tokio::spawn(async move {
            bus.deregister_all(&request_id).await;
        });
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    pub fn new() -> Self {
        Self {
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Registers a new streaming-connection handle for `request_id`
    /// (spec.md §4.7 "On connect: accept, register handle"). Dropping the
    /// returned [`Registration`] removes the handle (spec.md "On
    /// disconnect: remove from registry").
    pub async fn register(&self, request_id: &str) -> Registration {
        let (tx, rx) = mpsc::channel(HANDLE_BUFFER);
        self.handles
            .lock()
            .await
            .entry(request_id.to_string())
            .or_default()
            .push(tx);
        Registration {
            request_id: request_id.to_string(),
            bus: self.clone(),
            receiver: rx,
        }
    }

    /// Sends `payload` to every handle registered under `request_id`.
    /// Failing sends (full or closed channel) are logged and the handle is
    /// pruned; one slow client never blocks delivery to the rest.
    pub async fn broadcast(&self, request_id: &str, payload: Envelope) {
        let mut handles = self.handles.lock().await;
        let Some(senders) = handles.get_mut(request_id) else {
            return;
        };

        senders.retain(|tx| match tx.try_send(payload.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(request_id, "dropping_update_slow_client");
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        if senders.is_empty() {
            handles.remove(request_id);
        }
    }

    async fn deregister_all(&self, request_id: &str) {
        let mut handles = self.handles.lock().await;
        if let Some(senders) = handles.get_mut(request_id) {
            senders.retain(|tx| !tx.is_closed());
            if senders.is_empty() {
                handles.remove(request_id);
            }
        }
    }

    pub async fn registered_count(&self, request_id: &str) -> usize {
        self.handles
            .lock()
            .await
            .get(request_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Drains `confab-broker`'s `job_updates` subscriber and fans each message
/// out to `bus`. One task per front-end process (spec.md §9), never one per
/// client.
pub async fn run_bus_listener(mut subscriber: Subscriber, bus: Bus) {
    loop {
        match subscriber.recv().await {
            Ok(message) => {
                bus.broadcast(&message.request_id, message.data).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "job_updates_subscriber_error");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn broadcast_delivers_to_every_registered_handle() {
        let bus = Bus::new();
        let mut a = bus.register("job1").await;
        let mut b = bus.register("job1").await;

        bus.broadcast("job1", json!({"status": "assembling"})).await;

        assert_eq!(a.receiver.recv().await.unwrap()["status"], "assembling");
        assert_eq!(b.receiver.recv().await.unwrap()["status"], "assembling");
    }

    #[tokio::test]
    async fn broadcast_is_scoped_to_its_job() {
        let bus = Bus::new();
        let mut a = bus.register("job1").await;
        let _b = bus.register("job2").await;

        bus.broadcast("job2", json!({"status": "completed"})).await;

        assert!(a.receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn dropped_registration_is_removed() {
        let bus = Bus::new();
        {
            let _reg = bus.register("job1").await;
            assert_eq!(bus.registered_count("job1").await, 1);
        }
        // deregistration happens on a spawned task; yield until it runs.
        for _ in 0..50 {
            if bus.registered_count("job1").await == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(bus.registered_count("job1").await, 0);
    }

    #[tokio::test]
    async fn broadcast_to_unknown_job_is_a_noop() {
        let bus = Bus::new();
        bus.broadcast("nobody-home", json!({})).await;
    }
}
