// Failure taxonomy for the bridge layer
//
// Three disjoint families, kept disjoint on the wire: validation errors
// raised here before the engine is reached, failures reported by the
// engine itself, and host-platform errors. Engine failures are passed
// through verbatim — discriminant, optional message, optional code —
// never collapsed or reinterpreted.

use serde_json::{json, Value};
use std::fmt;
use thiserror::Error;

// ============================================================================
// ENGINE FAILURE REASONS
// ============================================================================

/// Which platform's engine binding can emit a reason. The union is kept
/// wide so the wire contract evolves additively; an adapter for a single
/// engine only ever produces its own subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformAvailability {
    All,
    AndroidOnly,
    IosOnly,
}

/// Closed set of reasons the engine reports for failed operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    // Reported by every engine binding
    AlreadyStarted,
    ExpiredLicense,
    InconsistentDeviceTime,
    InternetConnectionRequired,
    InvalidApiKey,
    SessionError,
    SimulatorIsNotSupported,
    /// Layer-originated fast-fail for commands issued before `initialize`.
    NotInitialized,

    // Android engine only
    DeviceCapabilities,
    Generic,
    MissingApplicationId,
    Permission,
    Registration,
    SizeLimitExceeded,
    Unknown,

    // iOS engine only
    MissingBundleId,
    InconsistentUserId,
    NotStarted,
    AlreadyInstantiated,
    StartInProgress,
    StopInProgress,
    DestroySessionInProgress,
    ServiceNotStarted,
    BleUsageNotGranted,
    BleUsageRestricted,
    BlePoweredOff,
    BleUnsupported,
    BleUnknownError,
    InconsistentConnection,
    ConnectionIsAlreadySecure,
    CannotCreateSecureConnection,
    DataLengthExceeded,
    DataValueIsEmpty,
    PeerIsNotConnected,
    InternalError,
    LicenseError,
    StorageError,
    EncodingError,
    EncryptionError,
}

impl FailureReason {
    /// Every reason, for exhaustive wire-mapping tests.
    pub const ALL: &'static [FailureReason] = &[
        Self::AlreadyStarted,
        Self::ExpiredLicense,
        Self::InconsistentDeviceTime,
        Self::InternetConnectionRequired,
        Self::InvalidApiKey,
        Self::SessionError,
        Self::SimulatorIsNotSupported,
        Self::NotInitialized,
        Self::DeviceCapabilities,
        Self::Generic,
        Self::MissingApplicationId,
        Self::Permission,
        Self::Registration,
        Self::SizeLimitExceeded,
        Self::Unknown,
        Self::MissingBundleId,
        Self::InconsistentUserId,
        Self::NotStarted,
        Self::AlreadyInstantiated,
        Self::StartInProgress,
        Self::StopInProgress,
        Self::DestroySessionInProgress,
        Self::ServiceNotStarted,
        Self::BleUsageNotGranted,
        Self::BleUsageRestricted,
        Self::BlePoweredOff,
        Self::BleUnsupported,
        Self::BleUnknownError,
        Self::InconsistentConnection,
        Self::ConnectionIsAlreadySecure,
        Self::CannotCreateSecureConnection,
        Self::DataLengthExceeded,
        Self::DataValueIsEmpty,
        Self::PeerIsNotConnected,
        Self::InternalError,
        Self::LicenseError,
        Self::StorageError,
        Self::EncodingError,
        Self::EncryptionError,
    ];

    /// The wire discriminant, exactly as the engine bindings spell it.
    pub fn discriminant(&self) -> &'static str {
        match self {
            Self::AlreadyStarted => "alreadyStarted",
            Self::ExpiredLicense => "expiredLicense",
            Self::InconsistentDeviceTime => "inconsistentDeviceTime",
            Self::InternetConnectionRequired => "internetConnectionRequired",
            Self::InvalidApiKey => "invalidAPIKey",
            Self::SessionError => "sessionError",
            Self::SimulatorIsNotSupported => "simulatorIsNotSupported",
            Self::NotInitialized => "notInitialized",
            Self::DeviceCapabilities => "deviceCapabilities",
            Self::Generic => "generic",
            Self::MissingApplicationId => "missingApplicationID",
            Self::Permission => "permission",
            Self::Registration => "registration",
            Self::SizeLimitExceeded => "sizeLimitExceeded",
            Self::Unknown => "unknown",
            Self::MissingBundleId => "missingBundleID",
            Self::InconsistentUserId => "inconsistentUserId",
            Self::NotStarted => "notStarted",
            Self::AlreadyInstantiated => "alreadyInstantiated",
            Self::StartInProgress => "startInProgress",
            Self::StopInProgress => "stopInProgress",
            Self::DestroySessionInProgress => "destroySessionInProgress",
            Self::ServiceNotStarted => "serviceNotStarted",
            Self::BleUsageNotGranted => "BLEUsageNotGranted",
            Self::BleUsageRestricted => "BLEUsageRestricted",
            Self::BlePoweredOff => "BLEPoweredOff",
            Self::BleUnsupported => "BLEUnsupported",
            Self::BleUnknownError => "BLEUnknownError",
            Self::InconsistentConnection => "inconsistentConnection",
            Self::ConnectionIsAlreadySecure => "connectionIsAlreadySecure",
            Self::CannotCreateSecureConnection => "cannotCreateSecureConnection",
            Self::DataLengthExceeded => "dataLengthExceeded",
            Self::DataValueIsEmpty => "dataValueIsEmpty",
            Self::PeerIsNotConnected => "peerIsNotConnected",
            Self::InternalError => "internalError",
            Self::LicenseError => "licenseError",
            Self::StorageError => "storageError",
            Self::EncodingError => "encodingError",
            Self::EncryptionError => "encryptionError",
        }
    }

    /// Inverse of [`discriminant`](Self::discriminant), for adapters that
    /// consume engine errors off a string-typed boundary.
    pub fn from_discriminant(text: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|reason| reason.discriminant() == text)
    }

    pub fn availability(&self) -> PlatformAvailability {
        match self {
            Self::AlreadyStarted
            | Self::ExpiredLicense
            | Self::InconsistentDeviceTime
            | Self::InternetConnectionRequired
            | Self::InvalidApiKey
            | Self::SessionError
            | Self::SimulatorIsNotSupported
            | Self::NotInitialized => PlatformAvailability::All,

            Self::DeviceCapabilities
            | Self::Generic
            | Self::MissingApplicationId
            | Self::Permission
            | Self::Registration
            | Self::SizeLimitExceeded
            | Self::Unknown => PlatformAvailability::AndroidOnly,

            Self::MissingBundleId
            | Self::InconsistentUserId
            | Self::NotStarted
            | Self::AlreadyInstantiated
            | Self::StartInProgress
            | Self::StopInProgress
            | Self::DestroySessionInProgress
            | Self::ServiceNotStarted
            | Self::BleUsageNotGranted
            | Self::BleUsageRestricted
            | Self::BlePoweredOff
            | Self::BleUnsupported
            | Self::BleUnknownError
            | Self::InconsistentConnection
            | Self::ConnectionIsAlreadySecure
            | Self::CannotCreateSecureConnection
            | Self::DataLengthExceeded
            | Self::DataValueIsEmpty
            | Self::PeerIsNotConnected
            | Self::InternalError
            | Self::LicenseError
            | Self::StorageError
            | Self::EncodingError
            | Self::EncryptionError => PlatformAvailability::IosOnly,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.discriminant())
    }
}

// ============================================================================
// ENGINE FAILURE
// ============================================================================

/// An engine-reported failure: a reason plus whatever detail the engine
/// attached. Surfaced verbatim to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub reason: FailureReason,
    pub message: Option<String>,
    pub code: Option<i64>,
}

impl Failure {
    pub fn new(reason: FailureReason) -> Self {
        Self {
            reason,
            message: None,
            code: None,
        }
    }

    pub fn with_message(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: Some(message.into()),
            code: None,
        }
    }

    pub fn with_code(reason: FailureReason, code: i64) -> Self {
        Self {
            reason,
            message: None,
            code: Some(code),
        }
    }

    /// Wire shape: `{type, message?, code?}`.
    pub fn to_wire(&self) -> Value {
        let mut wire = json!({ "type": self.reason.discriminant() });
        if let Some(message) = &self.message {
            wire["message"] = json!(message);
        }
        if let Some(code) = self.code {
            wire["code"] = json!(code);
        }
        wire
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }
        if let Some(code) = self.code {
            write!(f, " (code {code})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Failure {}

// ============================================================================
// VALIDATION AND PLATFORM ERRORS
// ============================================================================

/// Raised by this layer before any engine call, for missing or malformed
/// required fields. Message strings are part of the host contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("missing user identifier")]
    MissingUserId,
    #[error("missing fingerprint")]
    MissingFingerprint,
    #[error("missing payload")]
    MissingPayload,
    #[error("missing transmission mode")]
    MissingTransmissionMode,
    #[error("unrecognized transmission mode \"{0}\"")]
    UnrecognizedTransmissionMode(String),
    #[error("malformed payload")]
    MalformedPayload,
    #[error("unrecognized command \"{0}\"")]
    UnknownCommand(String),
    #[error("unrecognized event \"{0}\"")]
    UnknownEvent(String),
    #[error("malformed options: {0}")]
    MalformedOptions(String),
}

/// Host-OS errors, distinct from both validation and engine failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("failed to open system settings")]
    OpenSettings,
}

// ============================================================================
// BRIDGE ERROR
// ============================================================================

/// Everything a rejected command can carry back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Engine(#[from] Failure),
    #[error("{0}")]
    Platform(#[from] PlatformError),
}

impl BridgeError {
    /// The layer-owned fast-fail for commands issued before `initialize`.
    pub fn not_initialized() -> Self {
        Self::Engine(Failure::new(FailureReason::NotInitialized))
    }

    /// Structured rejection shape: `{type, message?, code?}`.
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Validation(error) => json!({
                "type": "validation",
                "message": error.to_string(),
            }),
            Self::Engine(failure) => failure.to_wire(),
            Self::Platform(error) => json!({
                "type": "platform",
                "message": error.to_string(),
            }),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
