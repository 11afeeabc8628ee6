// Event surface — the catalog of notifications the engine can emit and
// their host-facing wire payloads

use serde_json::{json, Value};
use std::fmt;

use crate::error::Failure;
use crate::types::{MessageId, Payload, PeerId, TransmissionMode, UserId};

// ============================================================================
// EVENT NAMES
// ============================================================================

/// Host-facing event names. These are the subscription keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Started,
    FailToStart,
    Stopped,
    FailToStop,
    DestroySession,
    FailToDestroySession,
    Connected,
    Disconnected,
    ConnectedPeers,
    EstablishSecureConnection,
    FailToEstablishSecureConnection,
    Send,
    FailToSend,
    ProgressOfSend,
    ReceiveData,
}

impl EventName {
    /// Every event name, in catalog order.
    pub const ALL: &'static [EventName] = &[
        Self::Started,
        Self::FailToStart,
        Self::Stopped,
        Self::FailToStop,
        Self::DestroySession,
        Self::FailToDestroySession,
        Self::Connected,
        Self::Disconnected,
        Self::ConnectedPeers,
        Self::EstablishSecureConnection,
        Self::FailToEstablishSecureConnection,
        Self::Send,
        Self::FailToSend,
        Self::ProgressOfSend,
        Self::ReceiveData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "onStarted",
            Self::FailToStart => "onFailToStart",
            Self::Stopped => "onStopped",
            Self::FailToStop => "onFailToStop",
            Self::DestroySession => "onDestroySession",
            Self::FailToDestroySession => "onFailToDestroySession",
            Self::Connected => "onConnected",
            Self::Disconnected => "onDisconnected",
            Self::ConnectedPeers => "onConnectedPeers",
            Self::EstablishSecureConnection => "onEstablishSecureConnection",
            Self::FailToEstablishSecureConnection => "onFailToEstablishSecureConnection",
            Self::Send => "onSend",
            Self::FailToSend => "onFailToSend",
            Self::ProgressOfSend => "onProgressOfSend",
            Self::ReceiveData => "onReceiveData",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|event| event.as_str() == name)
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ENGINE EVENTS
// ============================================================================

/// A notification pushed by the engine. One typed value per delegate
/// callback; conversion to the wire payload happens exactly once, at
/// publish time.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Started { user_id: UserId },
    FailToStart { failure: Failure },
    Stopped,
    FailToStop { failure: Failure },
    SessionDestroyed,
    FailToDestroySession { failure: Failure },
    Connected { peer_id: PeerId },
    Disconnected { peer_id: PeerId },
    /// Full snapshot of the connected set, not a delta.
    ConnectedPeers { peers: Vec<PeerId> },
    SecureConnectionEstablished { user_id: UserId },
    FailToEstablishSecureConnection { user_id: UserId, failure: Failure },
    Sent { message_id: MessageId },
    FailToSend { message_id: MessageId, failure: Failure },
    SendProgress { message_id: MessageId, position: u64, of: u64 },
    DataReceived {
        message_id: MessageId,
        data: Payload,
        transmission_mode: TransmissionMode,
    },
}

impl EngineEvent {
    pub fn name(&self) -> EventName {
        match self {
            Self::Started { .. } => EventName::Started,
            Self::FailToStart { .. } => EventName::FailToStart,
            Self::Stopped => EventName::Stopped,
            Self::FailToStop { .. } => EventName::FailToStop,
            Self::SessionDestroyed => EventName::DestroySession,
            Self::FailToDestroySession { .. } => EventName::FailToDestroySession,
            Self::Connected { .. } => EventName::Connected,
            Self::Disconnected { .. } => EventName::Disconnected,
            Self::ConnectedPeers { .. } => EventName::ConnectedPeers,
            Self::SecureConnectionEstablished { .. } => EventName::EstablishSecureConnection,
            Self::FailToEstablishSecureConnection { .. } => {
                EventName::FailToEstablishSecureConnection
            }
            Self::Sent { .. } => EventName::Send,
            Self::FailToSend { .. } => EventName::FailToSend,
            Self::SendProgress { .. } => EventName::ProgressOfSend,
            Self::DataReceived { .. } => EventName::ReceiveData,
        }
    }

    /// The JSON payload delivered to listeners of this event.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Started { user_id } => json!({ "userID": user_id }),
            Self::FailToStart { failure } => json!({ "error": failure.to_wire() }),
            Self::Stopped => json!({}),
            Self::FailToStop { failure } => json!({ "error": failure.to_wire() }),
            Self::SessionDestroyed => json!({}),
            Self::FailToDestroySession { failure } => json!({ "error": failure.to_wire() }),
            Self::Connected { peer_id } => json!({ "peerID": peer_id }),
            Self::Disconnected { peer_id } => json!({ "peerID": peer_id }),
            Self::ConnectedPeers { peers } => json!({ "peers": peers }),
            Self::SecureConnectionEstablished { user_id } => json!({ "userID": user_id }),
            Self::FailToEstablishSecureConnection { user_id, failure } => json!({
                "userID": user_id,
                "error": failure.to_wire(),
            }),
            Self::Sent { message_id } => json!({ "messageID": message_id }),
            Self::FailToSend { message_id, failure } => json!({
                "messageID": message_id,
                "error": failure.to_wire(),
            }),
            Self::SendProgress {
                message_id,
                position,
                of,
            } => json!({
                "messageID": message_id,
                "position": position,
                "of": of,
            }),
            Self::DataReceived {
                message_id,
                data,
                transmission_mode,
            } => {
                let mut wire = json!({
                    "messageID": message_id,
                    "transmissionMode": transmission_mode,
                });
                // Empty payloads omit the key; absent and empty stay
                // distinguishable on the way in, collapsed on the way out.
                if !data.is_empty() {
                    wire["data"] = json!(data.to_base64());
                }
                wire
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
