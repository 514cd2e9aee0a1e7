//! Realtime websocket sessions
//!
//! One session is two tasks: a reader that parses client requests and turns
//! them into hub commands, and a writer that drains the session's bounded
//! queue to the socket under a per-message deadline. The hub owns the only
//! sender half of the queue, so dropping the registration ends the writer.

use crate::context::BridgeContext;
use crate::hub::{HubHandle, SessionId};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use protocol::{ClientMessage, ClientRequest, PropertyPath, ServerMessage};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

pub async fn event_websocket(
    ws: WebSocketUpgrade,
    State(ctx): State<Arc<BridgeContext>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_session(socket, ctx))
}

async fn handle_session(socket: WebSocket, ctx: Arc<BridgeContext>) {
    let session = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);
    let (queue_tx, queue_rx) = mpsc::channel(ctx.session_queue_depth);

    if ctx.hub.register(session, queue_tx).await.is_err() {
        return;
    }
    debug!(session, "Realtime session opened");

    let (sender, receiver) = socket.split();
    let writer = tokio::spawn(write_loop(
        sender,
        queue_rx,
        ctx.write_timeout,
        session,
        ctx.hub.clone(),
    ));

    read_loop(receiver, session, &ctx.hub).await;

    // Unregistering drops the hub's sender, which closes the queue and
    // ends the writer if it has not already bailed out.
    let _ = ctx.hub.unregister(session).await;
    let _ = writer.await;
    debug!(session, "Realtime session closed");
}

async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut queue: mpsc::Receiver<ServerMessage>,
    deadline: Duration,
    session: SessionId,
    hub: HubHandle,
) {
    while let Some(message) = queue.recv().await {
        let text = match serde_json::to_string(&message) {
            Ok(text) => text,
            Err(e) => {
                error!(session, "Failed to serialize outbound message: {}", e);
                continue;
            }
        };

        match tokio::time::timeout(deadline, sender.send(Message::Text(text))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(session, "Write failed: {}", e);
                break;
            }
            Err(_) => {
                warn!(session, "Write deadline exceeded, closing session");
                break;
            }
        }
    }

    let _ = sender.close().await;
    let _ = hub.unregister(session).await;
}

async fn read_loop(mut receiver: SplitStream<WebSocket>, session: SessionId, hub: &HubHandle) {
    while let Some(result) = receiver.next().await {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                debug!(session, "Read failed: {}", e);
                break;
            }
        };

        match message {
            Message::Text(text) => handle_request(&text, session, hub).await,
            Message::Close(_) => break,
            // Pings are answered by axum; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }
}

/// Dispatch one client request
///
/// Malformed requests are logged and ignored; the session stays open.
async fn handle_request(text: &str, session: SessionId, hub: &HubHandle) {
    let request = match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Request(request)) => request,
        Err(e) => {
            warn!(session, "Ignoring invalid client request: {}", e);
            return;
        }
    };

    match request {
        ClientRequest::ListProperties => {
            let _ = hub.list_properties(session).await;
        }
        ClientRequest::Subscribe { properties } => {
            for raw in properties {
                match PropertyPath::parse(&raw) {
                    Some(path) => {
                        let _ = hub.subscribe(session, path).await;
                    }
                    None => warn!(session, property = %raw, "Ignoring unknown property path"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::spawn_hub;
    use crate::state::StateStore;
    use protocol::{EventBody, GainState, PropertyValue, ResponseBody, ShutterState};

    async fn session_under_test() -> (HubHandle, mpsc::Receiver<ServerMessage>) {
        let store = Arc::new(StateStore::new());
        let (hub, _task) = spawn_hub(store);
        let (tx, rx) = mpsc::channel(8);
        hub.register(7, tx).await.unwrap();
        (hub, rx)
    }

    #[tokio::test]
    async fn test_invalid_requests_are_ignored_session_survives() {
        let (hub, mut rx) = session_under_test().await;

        // Neither frame reaches the hub: not JSON, then a valid envelope
        // with an unknown type.
        handle_request("not even json", 7, &hub).await;
        handle_request(r#"{"type":"command","data":{"action":"reboot"}}"#, 7, &hub).await;
        assert!(rx.try_recv().is_err());

        // The session still dispatches after the bad frames.
        handle_request(
            r#"{"type":"request","data":{"action":"subscribe","properties":["/video/gain"]}}"#,
            7,
            &hub,
        )
        .await;
        let ServerMessage::Event(EventBody::PropertyValueChanged { property, value }) =
            rx.recv().await.unwrap()
        else {
            panic!("expected synthetic snapshot");
        };
        assert_eq!(property, PropertyPath::VideoGain);
        assert_eq!(value, PropertyValue::Gain(GainState::default()));
    }

    #[tokio::test]
    async fn test_unknown_property_path_skipped_valid_one_applies() {
        let (hub, mut rx) = session_under_test().await;

        handle_request(
            r#"{"type":"request","data":{"action":"subscribe","properties":["/video/nope","/video/shutter"]}}"#,
            7,
            &hub,
        )
        .await;

        // Only the valid path produced a subscription snapshot.
        let ServerMessage::Event(EventBody::PropertyValueChanged { property, value }) =
            rx.recv().await.unwrap()
        else {
            panic!("expected synthetic snapshot");
        };
        assert_eq!(property, PropertyPath::VideoShutter);
        assert_eq!(value, PropertyValue::Shutter(ShutterState::default()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_list_properties_request_reaches_hub() {
        let (hub, mut rx) = session_under_test().await;

        handle_request(
            r#"{"type":"request","data":{"action":"listProperties"}}"#,
            7,
            &hub,
        )
        .await;

        let ServerMessage::Response(ResponseBody::ListProperties { properties }) =
            rx.recv().await.unwrap()
        else {
            panic!("expected listProperties response");
        };
        assert_eq!(properties, PropertyPath::ALL.to_vec());
    }
}
