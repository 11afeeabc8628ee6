// MeshBridge core — the protocol layer between a host runtime and the
// proprietary mesh engine.
//
// Everything here is contract, not transport: identifier and payload
// canonicalization, the command/event catalog, the lifecycle state
// machine, and the closed failure taxonomy. The engine that actually
// moves bytes over the mesh sits behind the `MeshEngine` trait.

pub mod bus;
pub mod codec;
pub mod engine;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod loopback;
pub mod types;

pub use bus::{EventBus, ListenerHandle};
pub use engine::{EventPublisher, MeshEngine};
pub use error::{
    BridgeError, Failure, FailureReason, PlatformAvailability, PlatformError, ValidationError,
};
pub use event::{EngineEvent, EventName};
pub use lifecycle::{Lifecycle, Phase};
pub use loopback::LoopbackEngine;
pub use types::{
    ApiKey, Capability, MessageId, Payload, PeerId, PermissionState, PermissionStatus,
    PropagationProfile, TransmissionMode, UserId,
};
