//! Wiring of discovery, the bridge session and the key store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::config::{Config, DiscoveryConfig};
use crate::discovery::{BridgeAddress, Discovery, DiscoveryEvent};
use crate::errors::Error;
use crate::keystore::KeyStore;
use crate::runtime::{self, JoinHandle};
use crate::session::{BridgeSession, BridgeStatus, SessionEvent};

type Result<T> = std::result::Result<T, Error>;

/// Owns the bridge session and feeds it from discovery.
///
/// The first bridge discovery reports is accepted; later ones are ignored.
/// Discovery outcomes are forwarded onto the session's event stream, and every
/// new API key is written to the key store.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use hue_lights_rs::{BridgeDirectory, Config, MemoryKeyStore, SessionEvent};
///
/// # async fn run() -> Result<(), hue_lights_rs::Error> {
/// let directory = BridgeDirectory::start(&Config::default(), Arc::new(MemoryKeyStore::new())).await?;
/// let mut events = directory.session().subscribe();
/// while let Ok(event) = events.recv().await {
///     if let SessionEvent::BridgeFound(_) = event {
///         directory.session().create_user("hue-lights-rs#demo", None)?;
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct BridgeDirectory {
    session: BridgeSession,
    discovery: Option<Discovery>,
    discovery_error: Arc<AtomicBool>,
    pumps: Vec<JoinHandle<()>>,
}

impl BridgeDirectory {
    /// Create an HTTP session from `config` and start discovery.
    pub async fn start(config: &Config, key_store: Arc<dyn KeyStore>) -> Result<Self> {
        let session = BridgeSession::new(config.session.clone())?;
        Ok(Self::start_with(session, config.discovery.clone(), key_store).await)
    }

    /// Start discovery for an existing session.
    ///
    /// Subscribe to the session before calling this to also observe an
    /// immediate [`SessionEvent::DiscoveryError`].
    pub async fn start_with(
        session: BridgeSession,
        discovery_config: DiscoveryConfig,
        key_store: Arc<dyn KeyStore>,
    ) -> Self {
        if let Some(api_key) = key_store.api_key().filter(|k| !k.is_empty()) {
            debug!("Using stored api key");
            session.set_api_key(&api_key);
        }

        let mut pumps = vec![runtime::spawn(persist_api_keys(
            session.subscribe(),
            key_store,
        ))];
        let discovery_error = Arc::new(AtomicBool::new(false));

        let discovery = match Discovery::bind(discovery_config).await {
            Ok(discovery) => {
                pumps.push(runtime::spawn(forward_discovery(
                    discovery.subscribe(),
                    session.clone(),
                    Arc::clone(&discovery_error),
                )));
                discovery.find_bridges();
                Some(discovery)
            }
            Err(e) => {
                warn!("Bridge discovery unavailable: {}", e);
                discovery_error.store(true, Ordering::SeqCst);
                session.emit(SessionEvent::DiscoveryError(e.to_string()));
                None
            }
        };

        BridgeDirectory {
            session,
            discovery,
            discovery_error,
            pumps,
        }
    }

    pub fn session(&self) -> &BridgeSession {
        &self.session
    }

    pub fn discovery(&self) -> Option<&Discovery> {
        self.discovery.as_ref()
    }

    pub fn status(&self) -> BridgeStatus {
        self.session.status()
    }

    pub fn bridge_found(&self) -> bool {
        self.session.bridge_found()
    }

    /// Whether discovery failed, either to bind or to send.
    pub fn discovery_error(&self) -> bool {
        self.discovery_error.load(Ordering::SeqCst)
    }

    pub fn connected_bridge(&self) -> Option<BridgeAddress> {
        self.session.connected_bridge()
    }
}

impl Drop for BridgeDirectory {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

async fn forward_discovery(
    mut events: broadcast::Receiver<DiscoveryEvent>,
    session: BridgeSession,
    discovery_error: Arc<AtomicBool>,
) {
    loop {
        match events.recv().await {
            Ok(DiscoveryEvent::FoundBridge(bridge)) => match session.bridge() {
                Some(current) => debug!("Already using bridge {}, ignoring {}", current, bridge),
                None => session.set_bridge(bridge),
            },
            Ok(DiscoveryEvent::NoBridgesFound) => session.emit(SessionEvent::NoBridgesFound),
            Ok(DiscoveryEvent::Error(e)) => {
                discovery_error.store(true, Ordering::SeqCst);
                session.emit(SessionEvent::DiscoveryError(e));
            }
            Err(RecvError::Lagged(skipped)) => warn!("Missed {} discovery events", skipped),
            Err(RecvError::Closed) => return,
        }
    }
}

async fn persist_api_keys(
    mut events: broadcast::Receiver<SessionEvent>,
    key_store: Arc<dyn KeyStore>,
) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::ApiKeyChanged(api_key)) => {
                info!("Storing new api key");
                key_store.set_api_key(&api_key);
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!("Missed {} session events", skipped),
            Err(RecvError::Closed) => return,
        }
    }
}
