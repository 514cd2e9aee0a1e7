//! Websocket message definitions
//!
//! The real-time client protocol is JSON with a two-level envelope:
//! every message is `{"type": ..., "data": {...}}` and the data object is
//! discriminated by an `action` field.
//!
//! Client → server:
//! - `{"type":"request","data":{"action":"listProperties"}}`
//! - `{"type":"request","data":{"action":"subscribe","properties":[...]}}`
//!
//! Server → client:
//! - `{"type":"response","data":{"action":"listProperties","properties":[...]}}`
//! - `{"type":"event","data":{"action":"propertyValueChanged","property":...,"value":{...}}}`

use crate::properties::{PropertyEvent, PropertyPath, PropertyValue};
use serde::{Deserialize, Serialize};

/// Messages received from a real-time client
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ClientMessage {
    Request(ClientRequest),
}

/// Request payloads a client may issue
///
/// Unknown actions fail deserialization; the session logs and ignores them
/// without closing the connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientRequest {
    ListProperties,
    Subscribe {
        /// Requested property paths, validated individually
        properties: Vec<String>,
    },
}

/// Messages sent to a real-time client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum ServerMessage {
    Response(ResponseBody),
    Event(EventBody),
}

/// Response payloads
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ResponseBody {
    ListProperties { properties: Vec<PropertyPath> },
}

/// Event payloads
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EventBody {
    PropertyValueChanged {
        property: PropertyPath,
        value: PropertyValue,
    },
}

impl ServerMessage {
    /// The listProperties response carrying the full fixed path set
    pub fn property_list() -> ServerMessage {
        ServerMessage::Response(ResponseBody::ListProperties {
            properties: PropertyPath::ALL.to_vec(),
        })
    }

    /// A propertyValueChanged event for one state change
    pub fn property_changed(event: PropertyEvent) -> ServerMessage {
        ServerMessage::Event(EventBody::PropertyValueChanged {
            property: event.path,
            value: event.value,
        })
    }
}

impl From<PropertyEvent> for ServerMessage {
    fn from(event: PropertyEvent) -> Self {
        ServerMessage::property_changed(event)
    }
}
