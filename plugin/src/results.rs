// Typed command results and their wire shapes
//
// Key names match the host contract; optional values omit their key
// rather than serializing null.

use serde::Serialize;
use serde_json::Value;

use meshbridge_core::types::{MessageId, Payload, PeerId, UserId};

pub(crate) fn to_wire<T: Serialize>(result: &T) -> Value {
    serde_json::to_value(result).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct IsInitializedResult {
    #[serde(rename = "isInitialized")]
    pub is_initialized: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct IsStartedResult {
    #[serde(rename = "isStarted")]
    pub is_started: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LicenseExpirationDateResult {
    /// Milliseconds since epoch; omitted when the engine has no license.
    #[serde(
        rename = "licenseExpirationDate",
        skip_serializing_if = "Option::is_none"
    )]
    pub license_expiration_date: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CurrentUserIdResult {
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectedPeersResult {
    pub peers: Vec<PeerId>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SendResult {
    #[serde(rename = "messageID")]
    pub message_id: MessageId,
}

#[derive(Debug, Clone, Serialize)]
pub struct FingerprintResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

impl FingerprintResult {
    /// An empty fingerprint omits the key entirely.
    pub fn new(fingerprint: Payload) -> Self {
        Self {
            fingerprint: if fingerprint.is_empty() {
                None
            } else {
                Some(fingerprint.to_base64())
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct IsFingerprintValidResult {
    #[serde(rename = "isValid")]
    pub is_valid: bool,
}
