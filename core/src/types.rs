// Identifier, payload and mode types crossing the host boundary

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{self, InvalidUuid};

// ============================================================================
// IDENTIFIERS
// ============================================================================

/// Declares a UUID-backed identifier with canonical lowercase rendering
/// and case-insensitive parsing against the hyphenated grammar.
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                // `hyphenated` renders lowercase, the canonical output form
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = InvalidUuid;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                codec::decode_uuid(s).map(Self).ok_or(InvalidUuid)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Identity of a user in the mesh network. The engine assigns the
    /// local one on session start; remote ones arrive in events.
    UserId
);

uuid_id!(
    /// Identity of a remote device currently reachable over the mesh.
    PeerId
);

uuid_id!(
    /// Identity the engine assigns to one outbound message per `send`.
    MessageId
);

uuid_id!(
    /// License key handed to the engine at initialization.
    ApiKey
);

impl From<UserId> for PeerId {
    fn from(user_id: UserId) -> Self {
        Self(user_id.0)
    }
}

// ============================================================================
// PAYLOAD
// ============================================================================

/// Opaque bytes exchanged with the host as base64 text.
///
/// Zero-length is a real, representable value: an empty payload on input
/// is forwarded to the engine (which flags it), while an empty payload on
/// output omits its key from the result object.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Decode from base64 text. `None` means the text is not valid
    /// standard-alphabet base64; an empty string decodes to an empty
    /// payload, which is distinct from absent.
    pub fn from_base64(text: &str) -> Option<Self> {
        codec::decode_base64(text).map(Self)
    }

    pub fn to_base64(&self) -> String {
        codec::encode_base64(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() <= 16 {
            write!(f, "Payload({} bytes, {})", self.0.len(), hex::encode(&self.0))
        } else {
            write!(
                f,
                "Payload({} bytes, {}..)",
                self.0.len(),
                hex::encode(&self.0[..16])
            )
        }
    }
}

// ============================================================================
// TRANSMISSION MODE
// ============================================================================

/// How a payload travels through the mesh.
///
/// Wire form is `{"type": "broadcast" | "mesh" | "p2p", "uuid": "..."}`.
/// The identifier is the recipient for `Mesh` and `P2p`; for `Broadcast`
/// it is the sender's own user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransmissionMode {
    /// Deliver to every reachable peer, relayed hop by hop.
    Broadcast { uuid: UserId },
    /// Deliver to one recipient, relayed through intermediate peers.
    Mesh { uuid: UserId },
    /// Deliver to one recipient only over a direct, active link.
    P2p { uuid: UserId },
}

impl TransmissionMode {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Broadcast { .. } => "broadcast",
            Self::Mesh { .. } => "mesh",
            Self::P2p { .. } => "p2p",
        }
    }

    /// The identifier the variant carries.
    pub fn uuid(&self) -> &UserId {
        match self {
            Self::Broadcast { uuid } | Self::Mesh { uuid } | Self::P2p { uuid } => uuid,
        }
    }
}

impl fmt::Display for TransmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self.uuid())
    }
}

// ============================================================================
// PROPAGATION PROFILE
// ============================================================================

/// Engine-internal tuning preset selected at session start. Opaque to
/// this layer; passed through verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropagationProfile {
    #[default]
    Standard,
    HighDensityEnvironment,
    SparseEnvironment,
    LongReach,
    ShortReach,
}

impl PropagationProfile {
    /// Parse a host-supplied profile name. Accepts both historical
    /// spellings of the density profiles; anything unrecognized yields
    /// `None` and callers fall back to `Standard`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::Standard),
            "highDensityEnvironment" | "highDensityNetwork" => Some(Self::HighDensityEnvironment),
            "sparseEnvironment" | "sparseNetwork" => Some(Self::SparseEnvironment),
            "longReach" => Some(Self::LongReach),
            "shortReach" => Some(Self::ShortReach),
            _ => None,
        }
    }
}

// ============================================================================
// PERMISSIONS
// ============================================================================

/// Host capabilities the mesh engine depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Bluetooth,
    Location,
}

impl Capability {
    /// Parse a host-supplied capability name. Unknown names are ignored
    /// by callers, matching the permissive host contract.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "bluetooth" => Some(Self::Bluetooth),
            "location" => Some(Self::Location),
            _ => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bluetooth => write!(f, "bluetooth"),
            Self::Location => write!(f, "location"),
        }
    }
}

/// Per-capability grant state reported by the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

/// Snapshot of the capabilities this layer cares about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStatus {
    pub bluetooth: PermissionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PermissionState>,
}

// ============================================================================
// TESTS
// ============================================================================
