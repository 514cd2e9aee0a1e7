//! Event hub
//!
//! A single task owns the registry of connected real-time sessions and is
//! its sole mutator; registration, unregistration and broadcast are issued
//! concurrently by many producers but serialized through the hub's command
//! inbox, so membership changes need no locking.
//!
//! Delivery to a session is a non-blocking enqueue onto its bounded queue.
//! A full queue means the consumer is too slow to keep up: the session is
//! evicted on the spot rather than allowed to stall delivery to anyone else.

use crate::state::StateStore;
use protocol::{PropertyEvent, PropertyPath, ServerMessage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Identifies one websocket session for the lifetime of the process
pub type SessionId = u64;

/// Hub inbox commands
#[derive(Debug)]
pub enum HubCommand {
    /// Add a session with an empty subscription set
    Register {
        session: SessionId,
        queue: mpsc::Sender<ServerMessage>,
    },
    /// Remove a session and close its queue; unknown sessions are a no-op
    Unregister { session: SessionId },
    /// Fan an event out to every session subscribed to its path
    Broadcast { event: PropertyEvent },
    /// Subscribe a session to a path and send it the current snapshot
    Subscribe {
        session: SessionId,
        path: PropertyPath,
    },
    /// Send a session the full fixed set of property paths
    ListProperties { session: SessionId },
}

struct SessionEntry {
    queue: mpsc::Sender<ServerMessage>,
    subscriptions: HashSet<PropertyPath>,
}

/// Producer-side handle to the hub task
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubCommand>,
}

impl HubHandle {
    pub async fn register(
        &self,
        session: SessionId,
        queue: mpsc::Sender<ServerMessage>,
    ) -> common::Result<()> {
        self.send(HubCommand::Register { session, queue }).await
    }

    pub async fn unregister(&self, session: SessionId) -> common::Result<()> {
        self.send(HubCommand::Unregister { session }).await
    }

    pub async fn broadcast(&self, event: PropertyEvent) -> common::Result<()> {
        self.send(HubCommand::Broadcast { event }).await
    }

    pub async fn subscribe(&self, session: SessionId, path: PropertyPath) -> common::Result<()> {
        self.send(HubCommand::Subscribe { session, path }).await
    }

    pub async fn list_properties(&self, session: SessionId) -> common::Result<()> {
        self.send(HubCommand::ListProperties { session }).await
    }

    async fn send(&self, cmd: HubCommand) -> common::Result<()> {
        self.tx
            .send(cmd)
            .await
            .map_err(|e| common::Error::Channel(e.to_string()))
    }
}

/// Spawn the hub control loop
pub fn spawn_hub(store: Arc<StateStore>) -> (HubHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(256);
    let handle = tokio::spawn(run_hub(store, rx));
    (HubHandle { tx }, handle)
}

async fn run_hub(store: Arc<StateStore>, mut inbox: mpsc::Receiver<HubCommand>) {
    let mut sessions: HashMap<SessionId, SessionEntry> = HashMap::new();

    while let Some(cmd) = inbox.recv().await {
        match cmd {
            HubCommand::Register { session, queue } => {
                debug!(session, "Session registered");
                sessions.insert(
                    session,
                    SessionEntry {
                        queue,
                        subscriptions: HashSet::new(),
                    },
                );
            }

            HubCommand::Unregister { session } => {
                // Dropping the entry closes the queue, which terminates the
                // session's writer and closes its connection.
                if sessions.remove(&session).is_some() {
                    debug!(session, "Session unregistered");
                }
            }

            HubCommand::Broadcast { event } => {
                let message = ServerMessage::property_changed(event);
                let mut evicted = Vec::new();

                for (&session, entry) in &sessions {
                    if !entry.subscriptions.contains(&event.path) {
                        continue;
                    }
                    if let Err(e) = entry.queue.try_send(message.clone()) {
                        if matches!(e, TrySendError::Full(_)) {
                            warn!(session, path = %event.path, "Slow consumer, evicting session");
                        }
                        evicted.push(session);
                    }
                }

                for session in evicted {
                    sessions.remove(&session);
                }
            }

            HubCommand::Subscribe { session, path } => {
                let snapshot = store.snapshot(path).await;
                if let Some(entry) = sessions.get_mut(&session) {
                    entry.subscriptions.insert(path);
                    // Synthetic event so a new subscriber sees current state
                    // without waiting for the next hardware-driven change.
                    let message = ServerMessage::property_changed(PropertyEvent {
                        path,
                        value: snapshot,
                    });
                    if entry.queue.try_send(message).is_err() {
                        warn!(session, %path, "Session queue unavailable on subscribe, evicting");
                        sessions.remove(&session);
                    }
                }
            }

            HubCommand::ListProperties { session } => {
                if let Some(entry) = sessions.get(&session) {
                    if entry.queue.try_send(ServerMessage::property_list()).is_err() {
                        warn!(session, "Session queue unavailable on listProperties, evicting");
                        sessions.remove(&session);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{GainState, PropertyValue, ResponseBody, ServerMessage, WhiteBalanceState};
    use tokio::sync::mpsc::Receiver;

    fn gain_event(gain: f32) -> PropertyEvent {
        PropertyEvent {
            path: PropertyPath::VideoGain,
            value: PropertyValue::Gain(GainState { gain }),
        }
    }

    fn wb_event(kelvin: u32) -> PropertyEvent {
        PropertyEvent {
            path: PropertyPath::VideoWhiteBalance,
            value: PropertyValue::WhiteBalance(WhiteBalanceState {
                white_balance: kelvin,
            }),
        }
    }

    async fn register(hub: &HubHandle, session: SessionId, depth: usize) -> Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(depth);
        hub.register(session, tx).await.unwrap();
        rx
    }

    fn assert_event(msg: ServerMessage, path: PropertyPath, value: PropertyValue) {
        let ServerMessage::Event(protocol::EventBody::PropertyValueChanged {
            property,
            value: got,
        }) = msg
        else {
            panic!("expected propertyValueChanged event");
        };
        assert_eq!(property, path);
        assert_eq!(got, value);
    }

    #[tokio::test]
    async fn test_subscribe_sends_synthetic_snapshot() {
        let store = Arc::new(StateStore::new());
        let (hub, _task) = spawn_hub(store);

        let mut rx = register(&hub, 1, 8).await;
        hub.subscribe(1, PropertyPath::VideoGain).await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_event(
            msg,
            PropertyPath::VideoGain,
            PropertyValue::Gain(GainState::default()),
        );
    }

    #[tokio::test]
    async fn test_broadcast_filters_by_subscription() {
        let store = Arc::new(StateStore::new());
        let (hub, _task) = spawn_hub(store);

        let mut rx = register(&hub, 1, 8).await;
        hub.subscribe(1, PropertyPath::VideoGain).await.unwrap();
        let _ = rx.recv().await.unwrap(); // synthetic snapshot

        hub.broadcast(wb_event(5_600)).await.unwrap();
        hub.broadcast(gain_event(2.0)).await.unwrap();

        // Only the gain event arrives; the white balance event was filtered.
        let msg = rx.recv().await.unwrap();
        assert_event(
            msg,
            PropertyPath::VideoGain,
            PropertyValue::Gain(GainState { gain: 2.0 }),
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_preserves_emission_order() {
        let store = Arc::new(StateStore::new());
        let (hub, _task) = spawn_hub(store);

        let mut rx = register(&hub, 1, 16).await;
        hub.subscribe(1, PropertyPath::VideoGain).await.unwrap();
        let _ = rx.recv().await.unwrap();

        for gain in [1.0, 2.0, 3.0, 4.0] {
            hub.broadcast(gain_event(gain)).await.unwrap();
        }
        for gain in [1.0f32, 2.0, 3.0, 4.0] {
            let msg = rx.recv().await.unwrap();
            assert_event(
                msg,
                PropertyPath::VideoGain,
                PropertyValue::Gain(GainState { gain }),
            );
        }
    }

    #[tokio::test]
    async fn test_each_subscriber_gets_exactly_one_copy() {
        let store = Arc::new(StateStore::new());
        let (hub, _task) = spawn_hub(store);

        let mut rx1 = register(&hub, 1, 8).await;
        let mut rx2 = register(&hub, 2, 8).await;
        hub.subscribe(1, PropertyPath::VideoGain).await.unwrap();
        hub.subscribe(2, PropertyPath::VideoGain).await.unwrap();
        let _ = rx1.recv().await.unwrap();
        let _ = rx2.recv().await.unwrap();

        hub.broadcast(gain_event(6.0)).await.unwrap();

        let msg1 = rx1.recv().await.unwrap();
        assert_event(
            msg1,
            PropertyPath::VideoGain,
            PropertyValue::Gain(GainState { gain: 6.0 }),
        );
        let msg2 = rx2.recv().await.unwrap();
        assert_event(
            msg2,
            PropertyPath::VideoGain,
            PropertyValue::Gain(GainState { gain: 6.0 }),
        );
        assert!(rx1.try_recv().is_err());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_slow_consumer_is_evicted_others_unaffected() {
        let store = Arc::new(StateStore::new());
        let (hub, _task) = spawn_hub(store);

        // Session 1 has a depth-1 queue and is never drained.
        let mut slow_rx = register(&hub, 1, 1).await;
        let mut fast_rx = register(&hub, 2, 16).await;
        hub.subscribe(1, PropertyPath::VideoGain).await.unwrap();
        hub.subscribe(2, PropertyPath::VideoGain).await.unwrap();
        let _ = fast_rx.recv().await.unwrap();

        // First broadcast fills the slow queue (snapshot already occupies it),
        // forcing eviction; the fast session keeps receiving.
        hub.broadcast(gain_event(1.0)).await.unwrap();
        hub.broadcast(gain_event(2.0)).await.unwrap();

        let msg = fast_rx.recv().await.unwrap();
        assert_event(
            msg,
            PropertyPath::VideoGain,
            PropertyValue::Gain(GainState { gain: 1.0 }),
        );
        let msg = fast_rx.recv().await.unwrap();
        assert_event(
            msg,
            PropertyPath::VideoGain,
            PropertyValue::Gain(GainState { gain: 2.0 }),
        );

        // The slow session's queue was closed by eviction: after draining the
        // synthetic snapshot, the channel reports disconnection.
        let _snapshot = slow_rx.recv().await.unwrap();
        assert!(slow_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_no_replay() {
        let store = Arc::new(StateStore::new());
        let (hub, _task) = spawn_hub(store.clone());

        // State changes before the session subscribes.
        for event in store.apply_sensor_state(3.0, 1.0, 20_000, 5_600).await {
            hub.broadcast(event).await.unwrap();
        }

        let mut rx = register(&hub, 1, 8).await;
        hub.subscribe(1, PropertyPath::VideoGain).await.unwrap();

        // Exactly one message: the synthetic snapshot with current state,
        // not a replay of earlier broadcasts.
        let msg = rx.recv().await.unwrap();
        assert_event(
            msg,
            PropertyPath::VideoGain,
            PropertyValue::Gain(GainState { gain: 3.0 }),
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_list_properties_returns_full_set() {
        let store = Arc::new(StateStore::new());
        let (hub, _task) = spawn_hub(store);

        let mut rx = register(&hub, 1, 8).await;
        hub.list_properties(1).await.unwrap();

        let ServerMessage::Response(ResponseBody::ListProperties { properties }) =
            rx.recv().await.unwrap()
        else {
            panic!("expected listProperties response");
        };
        assert_eq!(properties, PropertyPath::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_unregister_unknown_session_is_noop() {
        let store = Arc::new(StateStore::new());
        let (hub, _task) = spawn_hub(store);
        hub.unregister(42).await.unwrap();

        // Hub still works afterwards.
        let mut rx = register(&hub, 1, 8).await;
        hub.list_properties(1).await.unwrap();
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_unregister_closes_queue() {
        let store = Arc::new(StateStore::new());
        let (hub, _task) = spawn_hub(store);

        let mut rx = register(&hub, 1, 8).await;
        hub.unregister(1).await.unwrap();
        assert!(rx.recv().await.is_none());
    }
}
