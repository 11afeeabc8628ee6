// Send contract: validation versus engine-flagged payloads, terminal
// event exclusivity, progress ordering, and the broadcast sender
// fill-in — all over the loopback engine.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use meshbridge_core::error::{BridgeError, FailureReason, ValidationError};
use meshbridge_core::event::EventName;
use meshbridge_core::loopback::{MAX_PAYLOAD_BYTES, PROGRESS_CHUNK_BYTES};
use meshbridge_core::types::Payload;
use meshbridge_plugin::{command, BridgeConfig, MeshBridge};

const API_KEY: &str = "123e4567-e89b-12d3-a456-426614174000";

type Events = Arc<Mutex<Vec<(&'static str, Value)>>>;

fn collect_all(bridge: &MeshBridge) -> Events {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    for name in EventName::ALL {
        let sink = Arc::clone(&events);
        let key = name.as_str();
        bridge.subscribe_event(*name, move |payload| {
            sink.lock().push((key, payload.clone()));
        });
    }
    events
}

async fn started_bridge() -> (MeshBridge, meshbridge_core::LoopbackEngine, Events) {
    let (bridge, engine) = MeshBridge::loopback(BridgeConfig::default());
    let events = collect_all(&bridge);
    bridge
        .invoke(command::INITIALIZE, Some(json!({ "apiKey": API_KEY })))
        .await
        .unwrap();
    bridge
        .invoke(command::START, Some(json!({ "propagationProfile": "standard" })))
        .await
        .unwrap();
    events.lock().clear();
    (bridge, engine, events)
}

fn terminal_events(events: &Events, message_id: &str) -> Vec<&'static str> {
    events
        .lock()
        .iter()
        .filter(|(name, payload)| {
            (*name == "onSend" || *name == "onFailToSend") && payload["messageID"] == message_id
        })
        .map(|(name, _)| *name)
        .collect()
}

#[tokio::test]
async fn test_scenario_initialize_start_send_broadcast() {
    let (bridge, _engine) = MeshBridge::loopback(BridgeConfig::default());
    let events = collect_all(&bridge);

    bridge
        .invoke(command::INITIALIZE, Some(json!({ "apiKey": API_KEY })))
        .await
        .unwrap();
    let result = bridge.invoke(command::IS_INITIALIZED, None).await.unwrap().unwrap();
    assert_eq!(result["isInitialized"], true);

    bridge
        .invoke(command::START, Some(json!({ "propagationProfile": "standard" })))
        .await
        .unwrap();
    let result = bridge.invoke(command::IS_STARTED, None).await.unwrap().unwrap();
    assert_eq!(result["isStarted"], true);

    let user_id = bridge
        .invoke(command::CURRENT_USER_ID, None)
        .await
        .unwrap()
        .unwrap()["userID"]
        .as_str()
        .unwrap()
        .to_string();

    let result = bridge
        .invoke(
            command::SEND,
            Some(json!({
                "data": "SGVsbG8=",
                "transmissionMode": { "type": "broadcast", "uuid": user_id },
            })),
        )
        .await
        .unwrap()
        .unwrap();
    let message_id = result["messageID"].as_str().unwrap().to_string();

    // Exactly one terminal event, bearing the same message id
    assert_eq!(terminal_events(&events, &message_id), vec!["onSend"]);

    // The loopback echo delivers the payload back intact
    let events = events.lock();
    let received = events
        .iter()
        .find(|(name, _)| *name == "onReceiveData")
        .expect("broadcast echoes back");
    assert_eq!(received.1["messageID"], message_id.as_str());
    assert_eq!(received.1["data"], "SGVsbG8=");
    assert_eq!(received.1["transmissionMode"]["type"], "broadcast");
}

#[tokio::test]
async fn test_absent_data_rejects_empty_data_reaches_engine() {
    let (bridge, _engine, events) = started_bridge().await;

    // Absent: validation error, no events
    let error = bridge
        .invoke(
            command::SEND,
            Some(json!({
                "transmissionMode": { "type": "broadcast" },
            })),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        BridgeError::Validation(ValidationError::MissingPayload)
    ));

    // Present but empty: dispatched, flagged by the engine
    let error = bridge
        .invoke(
            command::SEND,
            Some(json!({
                "data": "",
                "transmissionMode": { "type": "broadcast" },
            })),
        )
        .await
        .unwrap_err();
    let BridgeError::Engine(failure) = error else {
        panic!("expected an engine failure, got {error}");
    };
    assert_eq!(failure.reason, FailureReason::DataValueIsEmpty);
    assert!(events.lock().is_empty());
}

#[tokio::test]
async fn test_oversized_payload_is_engine_flagged() {
    let (bridge, _engine, _events) = started_bridge().await;
    let oversized = Payload::new(vec![0u8; MAX_PAYLOAD_BYTES + 1]).to_base64();

    let error = bridge
        .invoke(
            command::SEND,
            Some(json!({
                "data": oversized,
                "transmissionMode": { "type": "broadcast" },
            })),
        )
        .await
        .unwrap_err();
    let BridgeError::Engine(failure) = error else {
        panic!("expected an engine failure, got {error}");
    };
    assert_eq!(failure.reason, FailureReason::DataLengthExceeded);
}

#[tokio::test]
async fn test_broadcast_without_uuid_fills_in_sender() {
    let (bridge, _engine, events) = started_bridge().await;
    let user_id = bridge.current_user_id().await.unwrap().unwrap().to_string();

    bridge
        .invoke(
            command::SEND,
            Some(json!({
                "data": "cGluZw==",
                "transmissionMode": { "type": "broadcast" },
            })),
        )
        .await
        .unwrap();

    let events = events.lock();
    let received = events
        .iter()
        .find(|(name, _)| *name == "onReceiveData")
        .unwrap();
    assert_eq!(received.1["transmissionMode"]["uuid"], user_id.as_str());
}

#[tokio::test]
async fn test_progress_precedes_terminal_and_increases() {
    let (bridge, _engine, events) = started_bridge().await;
    let data = Payload::new(vec![7u8; PROGRESS_CHUNK_BYTES * 3]).to_base64();

    let result = bridge
        .invoke(
            command::SEND,
            Some(json!({
                "data": data,
                "transmissionMode": { "type": "broadcast" },
            })),
        )
        .await
        .unwrap()
        .unwrap();
    let message_id = result["messageID"].as_str().unwrap().to_string();

    let events = events.lock();
    let mut last_position = 0u64;
    let mut terminal_seen = false;
    for (name, payload) in events.iter() {
        if payload["messageID"] != message_id.as_str() {
            continue;
        }
        match *name {
            "onProgressOfSend" => {
                assert!(!terminal_seen, "progress after the terminal event");
                let position = payload["position"].as_u64().unwrap();
                let of = payload["of"].as_u64().unwrap();
                assert!(position > last_position);
                assert!(position <= of);
                last_position = position;
            }
            "onSend" | "onFailToSend" => {
                assert!(!terminal_seen, "terminal event fired twice");
                terminal_seen = true;
            }
            _ => {}
        }
    }
    assert!(terminal_seen);
    assert_eq!(last_position, 3);
}

#[tokio::test]
async fn test_p2p_to_absent_peer_terminates_with_fail_to_send() {
    let (bridge, _engine, events) = started_bridge().await;

    let result = bridge
        .invoke(
            command::SEND,
            Some(json!({
                "data": "ZGlyZWN0",
                "transmissionMode": {
                    "type": "p2p",
                    "uuid": "9f1b2c3d-0a1b-42c3-8d4e-5f6a7b8c9d0e",
                },
            })),
        )
        .await
        .unwrap()
        .unwrap();
    let message_id = result["messageID"].as_str().unwrap().to_string();

    assert_eq!(terminal_events(&events, &message_id), vec!["onFailToSend"]);
    let events = events.lock();
    let failure = events
        .iter()
        .find(|(name, _)| *name == "onFailToSend")
        .unwrap();
    assert_eq!(failure.1["error"]["type"], "peerIsNotConnected");
}

#[tokio::test]
async fn test_mesh_to_connected_peer_delivers() {
    let (bridge, engine, events) = started_bridge().await;
    let peer = engine.peer_joins().unwrap();

    let result = bridge
        .invoke(
            command::SEND,
            Some(json!({
                "data": "cmVsYXk=",
                "transmissionMode": { "type": "mesh", "uuid": peer.to_string() },
            })),
        )
        .await
        .unwrap()
        .unwrap();
    let message_id = result["messageID"].as_str().unwrap().to_string();

    assert_eq!(terminal_events(&events, &message_id), vec!["onSend"]);
    let events = events.lock();
    let received = events
        .iter()
        .find(|(name, _)| *name == "onReceiveData")
        .unwrap();
    assert_eq!(received.1["transmissionMode"]["type"], "mesh");
}

#[tokio::test]
async fn test_concurrent_sends_get_distinct_ids_and_terminals() {
    let (bridge, _engine, events) = started_bridge().await;
    let bridge = Arc::new(bridge);

    let sends = (0..5).map(|index| {
        let bridge = Arc::clone(&bridge);
        async move {
            let data = Payload::new(vec![index as u8; 8]).to_base64();
            bridge
                .invoke(
                    command::SEND,
                    Some(json!({
                        "data": data,
                        "transmissionMode": { "type": "broadcast" },
                    })),
                )
                .await
        }
    });

    let results = futures::future::join_all(sends).await;
    let mut message_ids = Vec::new();
    for result in results {
        let result = result.unwrap().unwrap();
        message_ids.push(result["messageID"].as_str().unwrap().to_string());
    }

    message_ids.sort();
    message_ids.dedup();
    assert_eq!(message_ids.len(), 5, "message ids must be unique");

    for message_id in &message_ids {
        assert_eq!(
            terminal_events(&events, message_id),
            vec!["onSend"],
            "exactly one terminal event per send"
        );
    }
}

#[tokio::test]
async fn test_unrecognized_mode_rejects_without_events() {
    let (bridge, _engine, events) = started_bridge().await;

    let error = bridge
        .invoke(
            command::SEND,
            Some(json!({
                "data": "SGVsbG8=",
                "transmissionMode": { "type": "multicast", "uuid": API_KEY },
            })),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        BridgeError::Validation(ValidationError::UnrecognizedTransmissionMode(_))
    ));
    assert!(events.lock().is_empty());
}
