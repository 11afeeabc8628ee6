// Engine abstraction — the seam between this layer and the proprietary
// mesh SDK

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::Failure;
use crate::event::EngineEvent;
use crate::types::{
    ApiKey, MessageId, Payload, PeerId, PropagationProfile, TransmissionMode, UserId,
};

/// Handed to an engine adapter so it can push delegate events into the
/// bridge. One publish path covers the whole event catalog.
#[derive(Clone)]
pub struct EventPublisher {
    sink: Arc<dyn Fn(EngineEvent) + Send + Sync>,
}

impl EventPublisher {
    pub fn new(sink: impl Fn(EngineEvent) + Send + Sync + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// A publisher that drops everything. Engines start with this until
    /// the bridge binds its own.
    pub fn discard() -> Self {
        Self::new(|_| {})
    }

    pub fn publish(&self, event: EngineEvent) {
        (self.sink)(event);
    }
}

impl fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventPublisher")
    }
}

/// The underlying mesh engine, consumed but never reimplemented here.
///
/// Method-per-command, mirroring the command surface; results carry the
/// engine's own [`Failure`] reasons verbatim. Delegate callbacks arrive
/// through the bound [`EventPublisher`] instead of per-event methods.
/// Operations may complete through the returned future, the paired
/// failure event, or both; callers must tolerate either channel.
#[async_trait]
pub trait MeshEngine: Send + Sync {
    /// Bind the publisher the engine uses for delegate events. Called
    /// once by the bridge before any command reaches the engine.
    fn bind_publisher(&self, publisher: EventPublisher);

    async fn initialize(&self, api_key: ApiKey, verbose_logging: bool) -> Result<(), Failure>;

    async fn is_initialized(&self) -> bool;

    /// Start mesh operations. A `None` user id asks the engine to
    /// generate one; the assigned id arrives in the started event.
    async fn start(
        &self,
        user_id: Option<UserId>,
        profile: PropagationProfile,
    ) -> Result<(), Failure>;

    async fn is_started(&self) -> bool;

    async fn stop(&self) -> Result<(), Failure>;

    /// Milliseconds since epoch, or `None` when no license is known.
    async fn license_expiration_date(&self) -> Result<Option<u64>, Failure>;

    async fn update_license(&self) -> Result<(), Failure>;

    async fn destroy_session(&self) -> Result<(), Failure>;

    async fn current_user_id(&self) -> Result<Option<UserId>, Failure>;

    /// Connected peers in connection order. The order is not stable
    /// across reconnects.
    async fn connected_peers(&self) -> Result<Vec<PeerId>, Failure>;

    async fn establish_secure_connection(&self, user_id: UserId) -> Result<(), Failure>;

    /// Opaque verification token for an established secure connection.
    async fn fingerprint(&self, user_id: UserId) -> Result<Payload, Failure>;

    async fn is_fingerprint_valid(
        &self,
        user_id: UserId,
        fingerprint: Payload,
    ) -> Result<bool, Failure>;

    /// Queue one payload for transmission. The returned id correlates
    /// the send with its progress and terminal events.
    async fn send(&self, data: Payload, mode: TransmissionMode) -> Result<MessageId, Failure>;
}
