// meshbridge — command-line host for the mesh bridge
//
// Drives the full command/event surface against the in-process loopback
// engine: useful for demos and for eyeballing the wire shapes a real
// host would see.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::{json, Value};

use meshbridge_core::codec;
use meshbridge_core::event::EventName;
use meshbridge_core::types::UserId;
use meshbridge_plugin::{command, BridgeConfig, MeshBridge};

#[derive(Parser)]
#[command(name = "meshbridge")]
#[command(about = "MeshBridge — host-side bridge for the mesh engine", long_about = None)]
#[command(version)]
struct Cli {
    /// API key handed to the engine at initialization
    #[arg(long, default_value = "123e4567-e89b-12d3-a456-426614174000")]
    api_key: String,

    /// Verbose engine and bridge logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scripted end-to-end demo over the loopback engine
    Demo {
        /// Plain-text message to broadcast
        #[arg(short, long, default_value = "Hello mesh!")]
        message: String,

        /// Simulated peers to bring into range
        #[arg(short, long, default_value = "2")]
        peers: u8,
    },
    /// Show the host permission snapshot
    Permissions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
            }),
        )
        .init();

    match cli.command {
        Commands::Demo { message, peers } => {
            cmd_demo(&cli.api_key, cli.verbose, &message, peers).await
        }
        Commands::Permissions => cmd_permissions().await,
    }
}

/// Print every engine event the way a host listener would receive it.
fn subscribe_printers(bridge: &MeshBridge) {
    for name in EventName::ALL {
        let key = name.as_str();
        bridge.subscribe_event(*name, move |payload| {
            println!("  {} {}", format!("<- {key}").cyan(), payload);
        });
    }
}

async fn invoke(bridge: &MeshBridge, name: &str, options: Option<Value>) -> Result<Option<Value>> {
    match &options {
        Some(options) => println!("{} {}", format!("-> {name}").green().bold(), options),
        None => println!("{}", format!("-> {name}").green().bold()),
    }
    match bridge.invoke(name, options).await {
        Ok(result) => {
            if let Some(result) = &result {
                println!("  {} {}", "=".dimmed(), result);
            }
            Ok(result)
        }
        Err(error) => {
            println!("  {} {}", "rejected".red(), error.to_wire());
            Err(anyhow::anyhow!("{name} rejected: {error}"))
        }
    }
}

async fn cmd_demo(api_key: &str, verbose: bool, message: &str, peers: u8) -> Result<()> {
    let config = BridgeConfig::from_value(&json!({
        "apiKey": api_key,
        "verboseLogging": verbose,
    }));
    anyhow::ensure!(
        config.api_key.is_some(),
        "--api-key must be a canonical UUID"
    );

    let (bridge, engine) = MeshBridge::loopback(config);
    subscribe_printers(&bridge);
    tracing::debug!("loopback bridge constructed");

    // Lifecycle: initialize (config fallback key), start, sanity queries
    invoke(&bridge, command::INITIALIZE, None).await?;
    invoke(&bridge, command::IS_INITIALIZED, None).await?;
    invoke(
        &bridge,
        command::START,
        Some(json!({ "propagationProfile": "standard" })),
    )
    .await?;
    invoke(&bridge, command::IS_STARTED, None).await?;

    let license = invoke(&bridge, command::LICENSE_EXPIRATION_DATE, None)
        .await?
        .context("license result expected")?;
    if let Some(expiry) = license["licenseExpirationDate"].as_u64() {
        if let Some(when) = chrono::DateTime::from_timestamp_millis(expiry as i64) {
            println!(
                "  {} license valid until {}",
                "·".dimmed(),
                when.format("%Y-%m-%d %H:%M UTC")
            );
        }
    }
    invoke(&bridge, command::CURRENT_USER_ID, None).await?;

    // Connectivity: bring simulated peers into range
    println!("{}", format!("~~ {peers} peer(s) coming into range").yellow());
    let mut in_range = Vec::new();
    for _ in 0..peers {
        if let Some(peer) = engine.peer_joins() {
            in_range.push(peer);
        }
    }
    invoke(&bridge, command::CONNECTED_PEERS, None).await?;

    // Secure connection and fingerprint with the first peer
    if let Some(peer) = in_range.first() {
        let user = UserId::new(*peer.as_uuid()).to_string();
        invoke(
            &bridge,
            command::ESTABLISH_SECURE_CONNECTION,
            Some(json!({ "userID": &user })),
        )
        .await?;
        let result = invoke(&bridge, command::FINGERPRINT, Some(json!({ "userID": &user })))
            .await?
            .context("fingerprint result expected")?;
        if let Some(fingerprint) = result["fingerprint"].as_str() {
            invoke(
                &bridge,
                command::IS_FINGERPRINT_VALID,
                Some(json!({ "userID": &user, "fingerprint": fingerprint })),
            )
            .await?;
        }
    }

    // Payloads: broadcast echo, mesh to a peer, p2p to a stranger
    let data = codec::encode_base64(message.as_bytes());
    invoke(
        &bridge,
        command::SEND,
        Some(json!({
            "data": &data,
            "transmissionMode": { "type": "broadcast" },
        })),
    )
    .await?;

    if let Some(peer) = in_range.first() {
        invoke(
            &bridge,
            command::SEND,
            Some(json!({
                "data": &data,
                "transmissionMode": { "type": "mesh", "uuid": peer.to_string() },
            })),
        )
        .await?;
    }

    println!("{}", "~~ p2p to a peer that is not in range".yellow());
    invoke(
        &bridge,
        command::SEND,
        Some(json!({
            "data": &data,
            "transmissionMode": { "type": "p2p", "uuid": UserId::generate().to_string() },
        })),
    )
    .await?;

    // Tear down
    invoke(&bridge, command::STOP, None).await?;
    invoke(&bridge, command::DESTROY_SESSION, None).await?;
    bridge.remove_all_listeners();
    println!("{}", "demo complete".green().bold());
    Ok(())
}

async fn cmd_permissions() -> Result<()> {
    let (bridge, _engine) = MeshBridge::loopback(BridgeConfig::default());
    invoke(&bridge, command::CHECK_PERMISSIONS, None).await?;
    invoke(
        &bridge,
        command::REQUEST_PERMISSIONS,
        Some(json!({ "permissions": ["bluetooth", "location"] })),
    )
    .await?;
    Ok(())
}
