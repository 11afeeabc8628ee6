// MeshBridge plugin — the uniform host-facing surface over the mesh
// engine
//
// One asynchronous command entry point (`invoke`), one event
// subscription surface, one lifecycle guard. The bridge keeps no
// session data beyond the phase that guard needs; every query command
// asks the engine live so nothing here can go stale.

pub mod config;
pub mod dispatch;
pub mod options;
pub mod permissions;
pub mod results;

use std::sync::Arc;

use serde_json::Value;

use meshbridge_core::bus::{EventBus, ListenerHandle};
use meshbridge_core::engine::{EventPublisher, MeshEngine};
use meshbridge_core::error::{BridgeError, ValidationError};
use meshbridge_core::event::EventName;
use meshbridge_core::lifecycle::{Lifecycle, Phase};
use meshbridge_core::loopback::LoopbackEngine;
use meshbridge_core::types::{MessageId, Payload, PeerId, PermissionStatus, UserId};

pub use config::BridgeConfig;
pub use dispatch::command;
pub use options::{
    EstablishSecureConnectionOptions, FingerprintOptions, InitializeOptions,
    IsFingerprintValidOptions, RequestPermissionsOptions, SendOptions, StartOptions,
};
pub use permissions::{PermissionGateway, StaticPermissions};

/// The bridge between a host runtime and one mesh engine instance.
pub struct MeshBridge {
    engine: Arc<dyn MeshEngine>,
    bus: EventBus,
    lifecycle: Arc<Lifecycle>,
    config: BridgeConfig,
    permissions: Arc<dyn PermissionGateway>,
}

impl MeshBridge {
    /// Wire a bridge to an engine. Binds the event publisher so engine
    /// delegate events flow through the lifecycle observer and then fan
    /// out to host listeners.
    pub fn new(
        engine: Arc<dyn MeshEngine>,
        config: BridgeConfig,
        permissions: Arc<dyn PermissionGateway>,
    ) -> Self {
        let bus = EventBus::new();
        let lifecycle = Arc::new(Lifecycle::new());

        let observer = Arc::clone(&lifecycle);
        let fanout = bus.clone();
        engine.bind_publisher(EventPublisher::new(move |event| {
            observer.observe(&event);
            fanout.publish(&event);
        }));

        Self {
            engine,
            bus,
            lifecycle,
            config,
            permissions,
        }
    }

    /// Convenience wiring over the in-process loopback engine, with all
    /// permissions granted. The returned engine handle drives simulated
    /// peer traffic.
    pub fn loopback(config: BridgeConfig) -> (Self, LoopbackEngine) {
        let engine = LoopbackEngine::new();
        let bridge = Self::new(
            Arc::new(engine.clone()),
            config,
            Arc::new(StaticPermissions::granted()),
        );
        (bridge, engine)
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    fn guard(&self) -> Result<(), BridgeError> {
        self.lifecycle.require_initialized().map_err(BridgeError::Engine)
    }

    // ------------------------------------------------------------------------
    // LIFECYCLE COMMANDS
    // ------------------------------------------------------------------------

    pub async fn initialize(&self, options: InitializeOptions) -> Result<(), BridgeError> {
        let api_key = options
            .api_key
            .or(self.config.api_key)
            .ok_or(ValidationError::MissingApiKey)?;
        self.lifecycle.begin_initialize()?;

        let verbose_logging = options
            .verbose_logging
            .unwrap_or(self.config.verbose_logging);
        self.engine.initialize(api_key, verbose_logging).await?;
        self.lifecycle.note_initialized();
        tracing::info!("bridge initialized");
        Ok(())
    }

    /// Never fails, even before `initialize`.
    pub async fn is_initialized(&self) -> bool {
        self.engine.is_initialized().await
    }

    pub async fn start(&self, options: StartOptions) -> Result<(), BridgeError> {
        self.guard()?;
        // The Started phase lands via the engine's own event, not here
        self.engine
            .start(options.user_id, options.propagation_profile)
            .await?;
        Ok(())
    }

    /// Never fails, even before `initialize`.
    pub async fn is_started(&self) -> bool {
        self.engine.is_started().await
    }

    pub async fn stop(&self) -> Result<(), BridgeError> {
        self.guard()?;
        self.engine.stop().await?;
        Ok(())
    }

    pub async fn license_expiration_date(&self) -> Result<Option<u64>, BridgeError> {
        self.guard()?;
        Ok(self.engine.license_expiration_date().await?)
    }

    pub async fn update_license(&self) -> Result<(), BridgeError> {
        self.guard()?;
        Ok(self.engine.update_license().await?)
    }

    pub async fn destroy_session(&self) -> Result<(), BridgeError> {
        self.guard()?;
        self.engine.destroy_session().await?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    // SESSION QUERIES
    // ------------------------------------------------------------------------

    pub async fn current_user_id(&self) -> Result<Option<UserId>, BridgeError> {
        self.guard()?;
        Ok(self.engine.current_user_id().await?)
    }

    pub async fn connected_peers(&self) -> Result<Vec<PeerId>, BridgeError> {
        self.guard()?;
        Ok(self.engine.connected_peers().await?)
    }

    // ------------------------------------------------------------------------
    // SECURE CONNECTION
    // ------------------------------------------------------------------------

    pub async fn establish_secure_connection(
        &self,
        options: EstablishSecureConnectionOptions,
    ) -> Result<(), BridgeError> {
        self.guard()?;
        Ok(self
            .engine
            .establish_secure_connection(options.user_id)
            .await?)
    }

    pub async fn fingerprint(&self, options: FingerprintOptions) -> Result<Payload, BridgeError> {
        self.guard()?;
        Ok(self.engine.fingerprint(options.user_id).await?)
    }

    pub async fn is_fingerprint_valid(
        &self,
        options: IsFingerprintValidOptions,
    ) -> Result<bool, BridgeError> {
        self.guard()?;
        Ok(self
            .engine
            .is_fingerprint_valid(options.user_id, options.fingerprint)
            .await?)
    }

    // ------------------------------------------------------------------------
    // PAYLOAD
    // ------------------------------------------------------------------------

    pub async fn send(&self, options: SendOptions) -> Result<MessageId, BridgeError> {
        self.guard()?;

        // Broadcast without a uuid borrows the session's own user id;
        // the live engine value, never a cached copy.
        let mode = if options.transmission_mode.needs_sender_fallback() {
            let sender = self.engine.current_user_id().await?;
            options.transmission_mode.resolve(sender)?
        } else {
            options.transmission_mode.resolve(None)?
        };

        let message_id = self.engine.send(options.data, mode).await?;
        tracing::debug!(%message_id, "send accepted");
        Ok(message_id)
    }

    // ------------------------------------------------------------------------
    // PERMISSIONS
    // ------------------------------------------------------------------------

    /// Usable in any phase; permission state belongs to the host OS.
    pub async fn check_permissions(&self) -> PermissionStatus {
        self.permissions.check().await
    }

    pub async fn request_permissions(
        &self,
        options: RequestPermissionsOptions,
    ) -> Result<PermissionStatus, BridgeError> {
        Ok(self.permissions.request(&options.capabilities).await?)
    }

    // ------------------------------------------------------------------------
    // EVENT SUBSCRIPTION
    // ------------------------------------------------------------------------

    /// Register a listener by wire event name. Safe in any phase.
    pub fn subscribe(
        &self,
        event_name: &str,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> Result<ListenerHandle, BridgeError> {
        let event = EventName::from_name(event_name)
            .ok_or_else(|| ValidationError::UnknownEvent(event_name.to_string()))?;
        Ok(self.bus.subscribe(event, callback))
    }

    /// Typed registration for in-process hosts.
    pub fn subscribe_event(
        &self,
        event: EventName,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> ListenerHandle {
        self.bus.subscribe(event, callback)
    }

    pub fn unsubscribe(&self, handle: &ListenerHandle) {
        self.bus.unsubscribe(handle);
    }

    pub fn remove_all_listeners(&self) {
        self.bus.unsubscribe_all();
    }
}
