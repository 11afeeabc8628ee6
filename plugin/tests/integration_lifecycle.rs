// Lifecycle contract: the phase machine, the not-initialized fast-fail,
// and the proof that neither validation nor the guard ever reaches the
// engine.

use std::sync::Arc;

use async_trait::async_trait;
use mockall::mock;
use serde_json::{json, Value};

use meshbridge_core::engine::{EventPublisher, MeshEngine};
use meshbridge_core::error::{BridgeError, Failure, FailureReason, ValidationError};
use meshbridge_core::lifecycle::Phase;
use meshbridge_core::types::{
    ApiKey, MessageId, Payload, PeerId, PropagationProfile, TransmissionMode, UserId,
};
use meshbridge_plugin::{command, BridgeConfig, MeshBridge, StaticPermissions};

mock! {
    pub Engine {}

    #[async_trait]
    impl MeshEngine for Engine {
        fn bind_publisher(&self, publisher: EventPublisher);
        async fn initialize(&self, api_key: ApiKey, verbose_logging: bool) -> Result<(), Failure>;
        async fn is_initialized(&self) -> bool;
        async fn start(
            &self,
            user_id: Option<UserId>,
            profile: PropagationProfile,
        ) -> Result<(), Failure>;
        async fn is_started(&self) -> bool;
        async fn stop(&self) -> Result<(), Failure>;
        async fn license_expiration_date(&self) -> Result<Option<u64>, Failure>;
        async fn update_license(&self) -> Result<(), Failure>;
        async fn destroy_session(&self) -> Result<(), Failure>;
        async fn current_user_id(&self) -> Result<Option<UserId>, Failure>;
        async fn connected_peers(&self) -> Result<Vec<PeerId>, Failure>;
        async fn establish_secure_connection(&self, user_id: UserId) -> Result<(), Failure>;
        async fn fingerprint(&self, user_id: UserId) -> Result<Payload, Failure>;
        async fn is_fingerprint_valid(
            &self,
            user_id: UserId,
            fingerprint: Payload,
        ) -> Result<bool, Failure>;
        async fn send(&self, data: Payload, mode: TransmissionMode) -> Result<MessageId, Failure>;
    }
}

const API_KEY: &str = "123e4567-e89b-12d3-a456-426614174000";
const USER: &str = "9f1b2c3d-0a1b-42c3-8d4e-5f6a7b8c9d0e";

/// A bridge over a mock engine with no command expectations: any engine
/// call past `bind_publisher` fails the test.
fn untouchable_bridge() -> MeshBridge {
    let mut engine = MockEngine::new();
    engine.expect_bind_publisher().times(1).return_const(());
    MeshBridge::new(
        Arc::new(engine),
        BridgeConfig::default(),
        Arc::new(StaticPermissions::granted()),
    )
}

fn reason_of(error: &BridgeError) -> Option<FailureReason> {
    match error {
        BridgeError::Engine(failure) => Some(failure.reason),
        _ => None,
    }
}

#[tokio::test]
async fn test_session_commands_fast_fail_before_initialize() {
    let bridge = untouchable_bridge();

    let secure_options = json!({ "userID": USER });
    let send_options = json!({
        "data": "SGVsbG8=",
        "transmissionMode": { "type": "mesh", "uuid": USER },
    });
    let fingerprint_options = json!({ "userID": USER, "fingerprint": "dG9r" });

    let calls: Vec<(&str, Option<Value>)> = vec![
        (command::START, None),
        (command::STOP, None),
        (command::LICENSE_EXPIRATION_DATE, None),
        (command::UPDATE_LICENSE, None),
        (command::DESTROY_SESSION, None),
        (command::CURRENT_USER_ID, None),
        (command::CONNECTED_PEERS, None),
        (
            command::ESTABLISH_SECURE_CONNECTION,
            Some(secure_options.clone()),
        ),
        (command::FINGERPRINT, Some(secure_options)),
        (command::IS_FINGERPRINT_VALID, Some(fingerprint_options)),
        (command::SEND, Some(send_options)),
    ];

    for (name, options) in calls {
        let error = bridge
            .invoke(name, options)
            .await
            .expect_err(&format!("{name} must reject while uninitialized"));
        assert_eq!(
            reason_of(&error),
            Some(FailureReason::NotInitialized),
            "{name} rejected with the wrong reason: {error}"
        );
    }
}

#[tokio::test]
async fn test_validation_precedes_engine_dispatch() {
    let bridge = untouchable_bridge();

    // No data, no transmission mode: rejected before guard and engine
    let error = bridge.invoke(command::SEND, Some(json!({}))).await.unwrap_err();
    assert!(matches!(
        error,
        BridgeError::Validation(ValidationError::MissingPayload)
    ));

    let error = bridge
        .invoke(command::ESTABLISH_SECURE_CONNECTION, Some(json!({})))
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        BridgeError::Validation(ValidationError::MissingUserId)
    ));
}

#[tokio::test]
async fn test_initialize_requires_an_api_key_from_somewhere() {
    let bridge = untouchable_bridge();
    let error = bridge.invoke(command::INITIALIZE, None).await.unwrap_err();
    assert!(matches!(
        error,
        BridgeError::Validation(ValidationError::MissingApiKey)
    ));
}

#[tokio::test]
async fn test_initialize_falls_back_to_configured_api_key() {
    let mut engine = MockEngine::new();
    engine.expect_bind_publisher().times(1).return_const(());
    engine
        .expect_initialize()
        .withf(|api_key, verbose| api_key.to_string() == API_KEY && !*verbose)
        .times(1)
        .returning(|_, _| Ok(()));

    let config = BridgeConfig::from_value(&json!({ "apiKey": API_KEY }));
    let bridge = MeshBridge::new(
        Arc::new(engine),
        config,
        Arc::new(StaticPermissions::granted()),
    );

    bridge.invoke(command::INITIALIZE, None).await.unwrap();
    assert_eq!(bridge.phase(), Phase::Initialized);
}

#[tokio::test]
async fn test_boolean_queries_reach_the_engine_live() {
    let mut engine = MockEngine::new();
    engine.expect_bind_publisher().times(1).return_const(());
    engine.expect_is_initialized().times(1).returning(|| false);
    engine.expect_is_started().times(1).returning(|| false);

    let bridge = MeshBridge::new(
        Arc::new(engine),
        BridgeConfig::default(),
        Arc::new(StaticPermissions::granted()),
    );

    assert!(!bridge.is_initialized().await);
    assert!(!bridge.is_started().await);
}

#[tokio::test]
async fn test_stop_while_uninitialized_emits_no_stopped_event() {
    let (bridge, _engine) = MeshBridge::loopback(BridgeConfig::default());

    let stopped = Arc::new(parking_lot::Mutex::new(0u32));
    let counter = Arc::clone(&stopped);
    bridge
        .subscribe("onStopped", move |_| *counter.lock() += 1)
        .unwrap();

    let error = bridge.invoke(command::STOP, None).await.unwrap_err();
    assert_eq!(reason_of(&error), Some(FailureReason::NotInitialized));
    assert_eq!(*stopped.lock(), 0);
}

#[tokio::test]
async fn test_second_initialize_fails_with_already_instantiated() {
    let (bridge, _engine) = MeshBridge::loopback(BridgeConfig::default());
    let options = json!({ "apiKey": API_KEY });

    bridge
        .invoke(command::INITIALIZE, Some(options.clone()))
        .await
        .unwrap();
    let error = bridge
        .invoke(command::INITIALIZE, Some(options))
        .await
        .unwrap_err();
    assert_eq!(reason_of(&error), Some(FailureReason::AlreadyInstantiated));
}

#[tokio::test]
async fn test_stop_returns_the_bridge_to_initialized() {
    let (bridge, _engine) = MeshBridge::loopback(BridgeConfig::default());

    bridge
        .invoke(command::INITIALIZE, Some(json!({ "apiKey": API_KEY })))
        .await
        .unwrap();
    bridge.invoke(command::START, None).await.unwrap();
    assert_eq!(bridge.phase(), Phase::Started);

    bridge.invoke(command::STOP, None).await.unwrap();
    assert_eq!(bridge.phase(), Phase::Initialized);

    // Still initialized: session commands keep working
    bridge.invoke(command::LICENSE_EXPIRATION_DATE, None).await.unwrap();
}

#[tokio::test]
async fn test_destroy_session_returns_to_uninitialized() {
    let (bridge, _engine) = MeshBridge::loopback(BridgeConfig::default());

    bridge
        .invoke(command::INITIALIZE, Some(json!({ "apiKey": API_KEY })))
        .await
        .unwrap();
    bridge.invoke(command::START, None).await.unwrap();
    bridge.invoke(command::DESTROY_SESSION, None).await.unwrap();

    assert_eq!(bridge.phase(), Phase::Uninitialized);
    assert!(!bridge.is_initialized().await);

    let error = bridge.invoke(command::CONNECTED_PEERS, None).await.unwrap_err();
    assert_eq!(reason_of(&error), Some(FailureReason::NotInitialized));
}

#[tokio::test]
async fn test_permissions_work_in_any_phase() {
    let (bridge, _engine) = MeshBridge::loopback(BridgeConfig::default());

    let status = bridge.invoke(command::CHECK_PERMISSIONS, None).await.unwrap().unwrap();
    assert_eq!(status["bluetooth"], "granted");

    let status = bridge
        .invoke(
            command::REQUEST_PERMISSIONS,
            Some(json!({ "permissions": ["bluetooth"] })),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status["bluetooth"], "granted");
}

#[tokio::test]
async fn test_engine_failures_surface_verbatim() {
    let mut engine = MockEngine::new();
    engine.expect_bind_publisher().times(1).return_const(());
    engine.expect_initialize().times(1).returning(|_, _| {
        Err(Failure::with_code(FailureReason::LicenseError, 14))
    });

    let bridge = MeshBridge::new(
        Arc::new(engine),
        BridgeConfig::default(),
        Arc::new(StaticPermissions::granted()),
    );

    let error = bridge
        .invoke(command::INITIALIZE, Some(json!({ "apiKey": API_KEY })))
        .await
        .unwrap_err();
    let wire = error.to_wire();
    assert_eq!(wire["type"], "licenseError");
    assert_eq!(wire["code"], 14);

    // Failed initialize leaves the bridge uninitialized
    assert_eq!(bridge.phase(), Phase::Uninitialized);
}
