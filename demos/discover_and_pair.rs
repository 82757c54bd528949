//! Find a Hue bridge, pair with it and turn every light red.
//!
//! This example demonstrates:
//! - Discovery of the bridge on the local network
//! - Pairing (press the bridge's link button when asked)
//! - Listing lights and writing a color to each of them
//!
//! Run with: cargo run --example discover_and_pair [API_KEY]

use std::sync::Arc;
use std::time::Duration;

use hue_lights_rs::{
    BridgeDirectory, BridgeStatus, Color, CollectionEvent, Config, LightCollection,
    MemoryKeyStore, SessionEvent,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let store = match std::env::args().nth(1) {
        Some(key) => MemoryKeyStore::with_key(&key),
        None => MemoryKeyStore::new(),
    };

    println!("Searching for a Hue bridge...");
    let directory = BridgeDirectory::start(&config, Arc::new(store)).await?;
    let session = directory.session();
    let mut events = session.subscribe();

    loop {
        match events.recv().await? {
            SessionEvent::BridgeFound(bridge) => {
                println!("Found bridge at {bridge}");
                if session.api_key().is_empty() {
                    println!("Press the link button on the bridge within 30 seconds...");
                    session.create_user("hue-lights-rs#demo", None)?;
                }
            }
            SessionEvent::NoBridgesFound => println!("No bridge yet, still searching"),
            SessionEvent::DiscoveryError(e) => return Err(e.into()),
            SessionEvent::CreateUserFailed(reason) => {
                println!("Pairing failed ({reason}), retrying");
                tokio::time::sleep(Duration::from_secs(2)).await;
                session.create_user("hue-lights-rs#demo", None)?;
            }
            SessionEvent::StatusChanged(BridgeStatus::AuthenticationFailure) => {
                println!("Stored key rejected, pairing instead");
                session.create_user("hue-lights-rs#demo", None)?;
            }
            SessionEvent::StatusChanged(BridgeStatus::Connected) => break,
            _ => {}
        }
    }
    println!("Connected, api key {}", session.api_key());

    let lights = LightCollection::new(session.clone(), config.light.clone());
    let mut changes = lights.subscribe();
    lights.refresh()?;
    while let Ok(Ok(CollectionEvent::LightAdded(id))) =
        tokio::time::timeout(Duration::from_secs(2), changes.recv()).await
    {
        println!("  - light {id}");
    }

    // Give every light a moment to fetch its state before writing
    tokio::time::sleep(Duration::from_secs(1)).await;
    let red = Color::rgb(255, 0, 0);
    for light in lights.lights() {
        println!("Setting {} ({}) to red", light.name(), light.model_id());
        light.set_color(&red);
    }
    tokio::time::sleep(Duration::from_secs(1)).await;

    Ok(())
}
