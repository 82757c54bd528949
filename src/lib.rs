//! # hue_lights_rs
//!
//! An async Rust library for discovering Philips Hue bridges and keeping light
//! state in sync with them.
//!
//! The crate finds a bridge with an SSDP search, pairs with it (or reuses a
//! stored API key) and exposes every light as a [`Light`] whose setters write
//! to the bridge's REST API without blocking the caller.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use hue_lights_rs::{
//!     BridgeDirectory, BridgeStatus, Config, LightCollection, MemoryKeyStore, SessionEvent,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let store = Arc::new(MemoryKeyStore::with_key("my-api-key"));
//!     let directory = BridgeDirectory::start(&config, store).await?;
//!
//!     let mut events = directory.session().subscribe();
//!     while let Ok(event) = events.recv().await {
//!         if event == SessionEvent::StatusChanged(BridgeStatus::Connected) {
//!             break;
//!         }
//!     }
//!
//!     let lights = LightCollection::new(directory.session().clone(), config.light.clone());
//!     lights.refresh()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Discovery**: [`Discovery`] repeats its M-SEARCH until a bridge answers
//! - **Pairing**: [`BridgeSession::create_user`] obtains an API key after the
//!   link button was pressed; a [`KeyStore`] keeps it
//! - **Request correlation**: every request gets a [`RequestId`] and its reply is
//!   routed to the callback given when it was issued, whatever the reply order
//! - **Write coalescing**: a [`Light`] has at most one state write in flight;
//!   changes made meanwhile collapse into a single follow-up [`StateUpdate`]
//! - **Colors**: [`Color`] values are written as CIE xy via [`rgb_to_xy`]
//!
//! ## Runtime
//!
//! The crate runs on tokio. Sessions, lights and discovery spawn tasks, so they
//! must be created from within a tokio runtime.

mod collection;
mod config;
mod directory;
mod discovery;
mod errors;
mod keystore;
mod light;
pub mod response;
pub mod runtime;
mod session;
mod state;
mod transform;
mod transport;
mod types;
mod update;

// Re-export public API
pub use collection::{CollectionEvent, LightCollection};
pub use config::{Config, DiscoveryConfig, LightConfig, SessionConfig};
pub use directory::BridgeDirectory;
pub use discovery::{BridgeAddress, Discovery, DiscoveryEvent};
pub use errors::Error;
pub use keystore::{KeyStore, MemoryKeyStore};
pub use light::{Light, LightEvent};
pub use session::{BridgeSession, BridgeStatus, RequestId, SessionEvent};
pub use state::{LightInfo, LightState};
pub use transform::rgb_to_xy;
pub use transport::{BridgeRequest, HttpTransport, Method, Transport};
pub use types::{Alert, Color, ColorMode, Effect, Xy};
pub use update::StateUpdate;
