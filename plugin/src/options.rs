// Typed command options parsed off the host's loose JSON
//
// Parsing owns the absent-versus-malformed rules: identifier fields that
// fail the canonical grammar read as not-provided, required fields that
// end up absent reject with the contract's fixed message strings, and an
// empty-but-present payload stays an empty payload.

use serde_json::{Map, Value};

use meshbridge_core::codec;
use meshbridge_core::error::ValidationError;
use meshbridge_core::types::{ApiKey, Capability, Payload, PropagationProfile, TransmissionMode, UserId};

fn object(options: Option<&Value>) -> Option<&Map<String, Value>> {
    options.and_then(Value::as_object)
}

fn uuid_field<T: From<uuid::Uuid>>(map: Option<&Map<String, Value>>, key: &str) -> Option<T> {
    map.and_then(|map| map.get(key))
        .and_then(Value::as_str)
        .and_then(codec::decode_uuid)
        .map(T::from)
}

fn bool_field(map: Option<&Map<String, Value>>, key: &str) -> Option<bool> {
    map.and_then(|map| map.get(key)).and_then(Value::as_bool)
}

fn str_field<'a>(map: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a str> {
    map.and_then(|map| map.get(key)).and_then(Value::as_str)
}

// ============================================================================
// INITIALIZE / START
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct InitializeOptions {
    pub api_key: Option<ApiKey>,
    pub verbose_logging: Option<bool>,
}

impl InitializeOptions {
    /// Never fails: the api key requirement is checked after the config
    /// fallback is applied.
    pub fn from_value(options: Option<&Value>) -> Self {
        let map = object(options);
        Self {
            api_key: uuid_field(map, "apiKey"),
            verbose_logging: bool_field(map, "verboseLogging"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    pub user_id: Option<UserId>,
    pub propagation_profile: PropagationProfile,
}

impl StartOptions {
    pub fn from_value(options: Option<&Value>) -> Self {
        let map = object(options);
        // Absent or unrecognized profiles fall back to Standard
        let propagation_profile = str_field(map, "propagationProfile")
            .and_then(PropagationProfile::parse)
            .unwrap_or_default();
        Self {
            user_id: uuid_field(map, "userID"),
            propagation_profile,
        }
    }
}

// ============================================================================
// SECURE CONNECTION
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct EstablishSecureConnectionOptions {
    pub user_id: UserId,
}

impl EstablishSecureConnectionOptions {
    pub fn from_value(options: Option<&Value>) -> Result<Self, ValidationError> {
        let user_id =
            uuid_field(object(options), "userID").ok_or(ValidationError::MissingUserId)?;
        Ok(Self { user_id })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FingerprintOptions {
    pub user_id: UserId,
}

impl FingerprintOptions {
    pub fn from_value(options: Option<&Value>) -> Result<Self, ValidationError> {
        let user_id =
            uuid_field(object(options), "userID").ok_or(ValidationError::MissingUserId)?;
        Ok(Self { user_id })
    }
}

#[derive(Debug, Clone)]
pub struct IsFingerprintValidOptions {
    pub user_id: UserId,
    pub fingerprint: Payload,
}

impl IsFingerprintValidOptions {
    pub fn from_value(options: Option<&Value>) -> Result<Self, ValidationError> {
        let map = object(options);
        let user_id = uuid_field(map, "userID").ok_or(ValidationError::MissingUserId)?;
        let fingerprint = match str_field(map, "fingerprint") {
            None => return Err(ValidationError::MissingFingerprint),
            Some(text) => Payload::from_base64(text).ok_or(ValidationError::MalformedPayload)?,
        };
        Ok(Self {
            user_id,
            fingerprint,
        })
    }
}

// ============================================================================
// SEND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransmissionKind {
    Broadcast,
    Mesh,
    P2p,
}

/// Transmission mode as the host sent it, before the broadcast
/// sender-id fill-in.
#[derive(Debug, Clone, Copy)]
pub struct TransmissionModeOptions {
    pub kind: TransmissionKind,
    pub uuid: Option<UserId>,
}

impl TransmissionModeOptions {
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        let map = value
            .as_object()
            .ok_or(ValidationError::MissingTransmissionMode)?;
        let tag = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingTransmissionMode)?;
        let kind = match tag {
            "broadcast" => TransmissionKind::Broadcast,
            "mesh" => TransmissionKind::Mesh,
            "p2p" => TransmissionKind::P2p,
            other => {
                return Err(ValidationError::UnrecognizedTransmissionMode(
                    other.to_string(),
                ))
            }
        };
        let uuid = map
            .get("uuid")
            .and_then(Value::as_str)
            .and_then(codec::decode_uuid)
            .map(UserId::new);
        Ok(Self { kind, uuid })
    }

    /// Broadcast may omit its uuid; the sender's own id fills it in.
    pub fn needs_sender_fallback(&self) -> bool {
        self.kind == TransmissionKind::Broadcast && self.uuid.is_none()
    }

    pub fn resolve(self, fallback_sender: Option<UserId>) -> Result<TransmissionMode, ValidationError> {
        match self.kind {
            TransmissionKind::Broadcast => {
                let uuid = self
                    .uuid
                    .or(fallback_sender)
                    .ok_or(ValidationError::MissingUserId)?;
                Ok(TransmissionMode::Broadcast { uuid })
            }
            TransmissionKind::Mesh => Ok(TransmissionMode::Mesh {
                uuid: self.uuid.ok_or(ValidationError::MissingUserId)?,
            }),
            TransmissionKind::P2p => Ok(TransmissionMode::P2p {
                uuid: self.uuid.ok_or(ValidationError::MissingUserId)?,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SendOptions {
    pub data: Payload,
    pub transmission_mode: TransmissionModeOptions,
}

impl SendOptions {
    pub fn from_value(options: Option<&Value>) -> Result<Self, ValidationError> {
        let map = object(options);

        // Absent data is a validation error; present-but-empty is a real
        // (empty) payload the engine gets to judge.
        let data = match map.and_then(|map| map.get("data")) {
            None | Some(Value::Null) => return Err(ValidationError::MissingPayload),
            Some(Value::String(text)) => {
                Payload::from_base64(text).ok_or(ValidationError::MalformedPayload)?
            }
            Some(_) => return Err(ValidationError::MalformedPayload),
        };

        let transmission_mode = match map.and_then(|map| map.get("transmissionMode")) {
            None | Some(Value::Null) => return Err(ValidationError::MissingTransmissionMode),
            Some(value) => TransmissionModeOptions::from_value(value)?,
        };

        Ok(Self {
            data,
            transmission_mode,
        })
    }
}

// ============================================================================
// PERMISSIONS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RequestPermissionsOptions {
    pub capabilities: Vec<Capability>,
}

impl RequestPermissionsOptions {
    /// Unknown capability names are ignored; an absent list asks for
    /// everything the layer cares about.
    pub fn from_value(options: Option<&Value>) -> Self {
        let capabilities = match object(options).and_then(|map| map.get("permissions")) {
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(Value::as_str)
                .filter_map(Capability::parse)
                .collect(),
            _ => vec![Capability::Bluetooth, Capability::Location],
        };
        Self { capabilities }
    }
}

// ============================================================================
// TESTS
// ============================================================================
