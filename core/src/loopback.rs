// Loopback engine — an in-process double of the hosted mesh SDK
//
// Mirrors the engine's observable contract (lifecycle guards, event
// ordering, failure reasons) without any transport or cryptography.
// Sends are echoed back to the local session, which makes the full
// command/event loop exercisable in tests and demos.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::engine::{EventPublisher, MeshEngine};
use crate::error::{Failure, FailureReason};
use crate::event::EngineEvent;
use crate::types::{
    ApiKey, MessageId, Payload, PeerId, PropagationProfile, TransmissionMode, UserId,
};

/// Largest payload the engine accepts for one send.
pub const MAX_PAYLOAD_BYTES: usize = 2048;

/// Chunk size used when reporting send progress. Payloads at or below
/// one chunk produce no progress events.
pub const PROGRESS_CHUNK_BYTES: usize = 512;

const LICENSE_TERM_MS: u64 = 365 * 24 * 60 * 60 * 1000;

#[derive(Debug)]
struct Session {
    user_id: UserId,
    profile: PropagationProfile,
    /// Connection order, the order `connectedPeers` reports.
    peers: Vec<PeerId>,
    secure: Vec<UserId>,
}

#[derive(Debug, Default)]
struct Inner {
    api_key: Option<ApiKey>,
    license_expires_at: Option<u64>,
    session: Option<Session>,
}

/// In-process engine double. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct LoopbackEngine {
    publisher: Arc<RwLock<EventPublisher>>,
    inner: Arc<Mutex<Inner>>,
}

impl LoopbackEngine {
    pub fn new() -> Self {
        Self {
            publisher: Arc::new(RwLock::new(EventPublisher::discard())),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Simulate a remote device coming into range. Emits the connected
    /// event plus a fresh connected-peers snapshot. Returns `None` when
    /// no session is running.
    pub fn peer_joins(&self) -> Option<PeerId> {
        self.peer_joins_as(PeerId::generate())
    }

    /// Like [`peer_joins`](Self::peer_joins) with a caller-chosen id.
    pub fn peer_joins_as(&self, peer_id: PeerId) -> Option<PeerId> {
        let events = {
            let mut inner = self.inner.lock();
            let session = inner.session.as_mut()?;
            if !session.peers.contains(&peer_id) {
                session.peers.push(peer_id);
            }
            vec![
                EngineEvent::Connected { peer_id },
                EngineEvent::ConnectedPeers {
                    peers: session.peers.clone(),
                },
            ]
        };
        self.emit(events);
        Some(peer_id)
    }

    /// Simulate a peer dropping out of range. Returns `false` when the
    /// peer was not connected.
    pub fn peer_leaves(&self, peer_id: &PeerId) -> bool {
        let events = {
            let mut inner = self.inner.lock();
            let Some(session) = inner.session.as_mut() else {
                return false;
            };
            let before = session.peers.len();
            session.peers.retain(|peer| peer != peer_id);
            if session.peers.len() == before {
                return false;
            }
            session
                .secure
                .retain(|user| user.as_uuid() != peer_id.as_uuid());
            vec![
                EngineEvent::Disconnected { peer_id: *peer_id },
                EngineEvent::ConnectedPeers {
                    peers: session.peers.clone(),
                },
            ]
        };
        self.emit(events);
        true
    }

    fn emit(&self, events: Vec<EngineEvent>) {
        // Clone the publisher out of the lock so listener callbacks can
        // re-enter the engine without deadlocking.
        let publisher = self.publisher.read().clone();
        for event in events {
            publisher.publish(event);
        }
    }

    fn not_initialized() -> Failure {
        Failure::with_message(FailureReason::NotInitialized, "engine not initialized")
    }

    fn not_started() -> Failure {
        Failure::new(FailureReason::NotStarted)
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Deterministic per-pair verification token: both uuids, sender last.
fn derive_fingerprint(remote: &UserId, local: &UserId) -> Payload {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(remote.as_uuid().as_bytes());
    bytes.extend_from_slice(local.as_uuid().as_bytes());
    Payload::new(bytes)
}

#[async_trait]
impl MeshEngine for LoopbackEngine {
    fn bind_publisher(&self, publisher: EventPublisher) {
        *self.publisher.write() = publisher;
    }

    async fn initialize(&self, api_key: ApiKey, verbose_logging: bool) -> Result<(), Failure> {
        let mut inner = self.inner.lock();
        if inner.api_key.is_some() {
            return Err(Failure::new(FailureReason::AlreadyInstantiated));
        }
        inner.api_key = Some(api_key);
        inner.license_expires_at = Some(now_ms() + LICENSE_TERM_MS);
        tracing::info!(verbose_logging, "loopback engine initialized");
        Ok(())
    }

    async fn is_initialized(&self) -> bool {
        self.inner.lock().api_key.is_some()
    }

    async fn start(
        &self,
        user_id: Option<UserId>,
        profile: PropagationProfile,
    ) -> Result<(), Failure> {
        let event = {
            let mut inner = self.inner.lock();
            if inner.api_key.is_none() {
                return Err(Self::not_initialized());
            }
            if inner.session.is_some() {
                return Err(Failure::new(FailureReason::AlreadyStarted));
            }
            let user_id = user_id.unwrap_or_else(UserId::generate);
            inner.session = Some(Session {
                user_id,
                profile,
                peers: Vec::new(),
                secure: Vec::new(),
            });
            tracing::info!(%user_id, ?profile, "loopback session started");
            EngineEvent::Started { user_id }
        };
        self.emit(vec![event]);
        Ok(())
    }

    async fn is_started(&self) -> bool {
        self.inner.lock().session.is_some()
    }

    async fn stop(&self) -> Result<(), Failure> {
        {
            let mut inner = self.inner.lock();
            if inner.session.take().is_none() {
                return Err(Self::not_started());
            }
            tracing::info!("loopback session stopped");
        }
        self.emit(vec![EngineEvent::Stopped]);
        Ok(())
    }

    async fn license_expiration_date(&self) -> Result<Option<u64>, Failure> {
        let inner = self.inner.lock();
        if inner.api_key.is_none() {
            return Err(Self::not_initialized());
        }
        Ok(inner.license_expires_at)
    }

    async fn update_license(&self) -> Result<(), Failure> {
        let mut inner = self.inner.lock();
        if inner.api_key.is_none() {
            return Err(Self::not_initialized());
        }
        inner.license_expires_at = Some(now_ms() + LICENSE_TERM_MS);
        tracing::info!("loopback license refreshed");
        Ok(())
    }

    async fn destroy_session(&self) -> Result<(), Failure> {
        {
            let mut inner = self.inner.lock();
            if inner.api_key.is_none() {
                return Err(Self::not_initialized());
            }
            *inner = Inner::default();
            tracing::info!("loopback session destroyed");
        }
        self.emit(vec![EngineEvent::SessionDestroyed]);
        Ok(())
    }

    async fn current_user_id(&self) -> Result<Option<UserId>, Failure> {
        Ok(self
            .inner
            .lock()
            .session
            .as_ref()
            .map(|session| session.user_id))
    }

    async fn connected_peers(&self) -> Result<Vec<PeerId>, Failure> {
        Ok(self
            .inner
            .lock()
            .session
            .as_ref()
            .map(|session| session.peers.clone())
            .unwrap_or_default())
    }

    async fn establish_secure_connection(&self, user_id: UserId) -> Result<(), Failure> {
        let event = {
            let mut inner = self.inner.lock();
            let session = inner.session.as_mut().ok_or_else(Self::not_started)?;
            if session.secure.contains(&user_id) {
                return Err(Failure::new(FailureReason::ConnectionIsAlreadySecure));
            }
            let connected = session
                .peers
                .iter()
                .any(|peer| peer.as_uuid() == user_id.as_uuid());
            if connected {
                session.secure.push(user_id);
                EngineEvent::SecureConnectionEstablished { user_id }
            } else {
                // The handshake outcome is delivered on the event
                // channel, matching the engine's asynchronous contract.
                EngineEvent::FailToEstablishSecureConnection {
                    user_id,
                    failure: Failure::new(FailureReason::PeerIsNotConnected),
                }
            }
        };
        self.emit(vec![event]);
        Ok(())
    }

    async fn fingerprint(&self, user_id: UserId) -> Result<Payload, Failure> {
        let inner = self.inner.lock();
        let session = inner.session.as_ref().ok_or_else(Self::not_started)?;
        if !session.secure.contains(&user_id) {
            return Err(Failure::new(FailureReason::CannotCreateSecureConnection));
        }
        Ok(derive_fingerprint(&user_id, &session.user_id))
    }

    async fn is_fingerprint_valid(
        &self,
        user_id: UserId,
        fingerprint: Payload,
    ) -> Result<bool, Failure> {
        let inner = self.inner.lock();
        let session = inner.session.as_ref().ok_or_else(Self::not_started)?;
        let valid = session.secure.contains(&user_id)
            && derive_fingerprint(&user_id, &session.user_id) == fingerprint;
        Ok(valid)
    }

    async fn send(&self, data: Payload, mode: TransmissionMode) -> Result<MessageId, Failure> {
        let (message_id, events) = {
            let inner = self.inner.lock();
            let session = inner.session.as_ref().ok_or_else(Self::not_started)?;

            if data.is_empty() {
                return Err(Failure::with_message(
                    FailureReason::DataValueIsEmpty,
                    "the data to send is empty",
                ));
            }
            if data.len() > MAX_PAYLOAD_BYTES {
                return Err(Failure::with_message(
                    FailureReason::DataLengthExceeded,
                    format!(
                        "payload of {} bytes exceeds the {} byte limit",
                        data.len(),
                        MAX_PAYLOAD_BYTES
                    ),
                ));
            }

            let message_id = MessageId::generate();
            let recipient_connected = |uuid: &UserId| {
                session
                    .peers
                    .iter()
                    .any(|peer| peer.as_uuid() == uuid.as_uuid())
            };

            // Broadcast and mesh-to-connected echo back locally; mesh to
            // an absent recipient stays in flight; p2p needs a live link.
            let delivered = match &mode {
                TransmissionMode::Broadcast { .. } => Some(true),
                TransmissionMode::Mesh { uuid } => Some(recipient_connected(uuid)),
                TransmissionMode::P2p { uuid } => {
                    if recipient_connected(uuid) {
                        Some(true)
                    } else {
                        None
                    }
                }
            };

            let mut events = Vec::new();
            match delivered {
                None => {
                    events.push(EngineEvent::FailToSend {
                        message_id,
                        failure: Failure::new(FailureReason::PeerIsNotConnected),
                    });
                }
                Some(echo) => {
                    let chunks = data.len().div_ceil(PROGRESS_CHUNK_BYTES) as u64;
                    if chunks > 1 {
                        for position in 1..=chunks {
                            events.push(EngineEvent::SendProgress {
                                message_id,
                                position,
                                of: chunks,
                            });
                        }
                    }
                    events.push(EngineEvent::Sent { message_id });
                    if echo {
                        events.push(EngineEvent::DataReceived {
                            message_id,
                            data: data.clone(),
                            transmission_mode: mode,
                        });
                    }
                }
            }
            (message_id, events)
        };

        tracing::debug!(%message_id, %mode, bytes = data.len(), "loopback send accepted");
        self.emit(events);
        Ok(message_id)
    }
}

// ============================================================================
// TESTS
// ============================================================================
