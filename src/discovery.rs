//! Bridge discovery via SSDP M-SEARCH over UDP multicast.

use std::collections::HashSet;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::DiscoveryConfig;
use crate::errors::Error;
use crate::runtime::{self, AsyncUdpSocket, JoinHandle, Timer, UdpSocket};

type Result<T> = std::result::Result<T, Error>;

/// Substring of an SSDP reply that identifies a Hue bridge (matched case-insensitively).
const BRIDGE_MARKER: &str = "ipbridge";

const RECV_RETRY_DELAY: Duration = Duration::from_millis(100);

/// IPv4 address of a discovered bridge.
///
/// Equality is by address only; the ephemeral port the reply came from is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeAddress(Ipv4Addr);

impl BridgeAddress {
    pub fn new(ip: Ipv4Addr) -> Self {
        Self(ip)
    }

    pub fn ip(&self) -> Ipv4Addr {
        self.0
    }

    /// Reduce a datagram sender to its IPv4 address.
    fn from_sender(sender: SocketAddr) -> Option<Self> {
        match sender {
            SocketAddr::V4(v4) => Some(Self(*v4.ip())),
            SocketAddr::V6(v6) => v6.ip().to_ipv4_mapped().map(Self),
        }
    }
}

impl From<Ipv4Addr> for BridgeAddress {
    fn from(ip: Ipv4Addr) -> Self {
        Self(ip)
    }
}

impl fmt::Display for BridgeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Notifications emitted by [`Discovery`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    /// A bridge answered the current search cycle. Reported once per address per cycle.
    FoundBridge(BridgeAddress),
    /// A search cycle timed out without any bridge; a new cycle has already started.
    NoBridgesFound,
    /// The search request could not be sent.
    Error(String),
}

/// Finds Hue bridges on the local network.
///
/// Each call to [`Discovery::find_bridges`] starts a search cycle: one M-SEARCH
/// datagram is sent and a timeout is armed. A cycle that ends without any
/// bridge reports [`DiscoveryEvent::NoBridgesFound`] and starts over, forever,
/// at the same fixed interval. The first bridge found in a cycle stops its
/// timeout.
///
/// # Examples
///
/// ```ignore
/// let discovery = Discovery::bind(DiscoveryConfig::default()).await?;
/// let mut events = discovery.subscribe();
/// discovery.find_bridges();
/// while let Ok(event) = events.recv().await {
///     if let DiscoveryEvent::FoundBridge(bridge) = event {
///         println!("bridge at {bridge}");
///         break;
///     }
/// }
/// ```
pub struct Discovery {
    shared: Arc<Shared>,
    receiver: JoinHandle<()>,
}

struct Shared {
    socket: UdpSocket,
    config: DiscoveryConfig,
    search: Mutex<SearchState>,
    events: broadcast::Sender<DiscoveryEvent>,
}

#[derive(Default)]
struct SearchState {
    reported: HashSet<BridgeAddress>,
    /// Incremented by every search so a timeout armed for an older cycle is ignored.
    cycle: u64,
    timeout: Timer,
}

impl Discovery {
    const RECV_BUFFER: usize = 4096;
    const EVENT_CAPACITY: usize = 32;

    /// Bind the discovery socket and start listening for replies.
    ///
    /// Ports `bind_port`, `bind_port + 1`, ... are tried up to
    /// `max_bind_attempts` times. Running out of attempts is terminal for this
    /// instance and reported as [`Error::DiscoveryBind`].
    pub async fn bind(config: DiscoveryConfig) -> Result<Self> {
        let socket = Self::bind_socket(&config).await?;
        let (events, _) = broadcast::channel(Self::EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            socket,
            config,
            search: Mutex::new(SearchState::default()),
            events,
        });
        let receiver = runtime::spawn(Shared::receive_loop(Arc::downgrade(&shared)));
        Ok(Discovery { shared, receiver })
    }

    async fn bind_socket(config: &DiscoveryConfig) -> Result<UdpSocket> {
        let mut port = config.bind_port;
        let mut attempts = 0;
        loop {
            debug!("Will bind discovery socket on port {}", port);
            let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
            match UdpSocket::bind(addr).await {
                Ok(socket) => {
                    if let Ok(local) = socket.local_addr() {
                        debug!("Discovery socket bound to {}", local);
                    }
                    return Ok(socket);
                }
                Err(err) => {
                    attempts += 1;
                    if attempts >= config.max_bind_attempts {
                        warn!("Failed to bind discovery socket after {} attempts", attempts);
                        return Err(Error::DiscoveryBind { attempts, err });
                    }
                    port = port.wrapping_add(1);
                    debug!("Failed to bind, next try on port {}", port);
                }
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DiscoveryEvent> {
        self.shared.events.subscribe()
    }

    /// The local address replies are received on.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.shared
            .socket
            .local_addr()
            .map_err(|e| Error::socket("local_addr", e))
    }

    /// Start a new search cycle, cancelling the pending timeout and forgetting
    /// the bridges reported so far.
    pub fn find_bridges(&self) {
        self.shared.find_bridges();
    }

    /// Bridges reported in the current search cycle.
    pub fn reported(&self) -> Vec<BridgeAddress> {
        self.shared.lock().reported.iter().copied().collect()
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        self.receiver.abort();
        self.shared.lock().timeout.stop();
    }
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, SearchState> {
        self.search.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: DiscoveryEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn search_request(&self) -> String {
        let target = self.config.search_target;
        format!(
            "M-SEARCH * HTTP/1.1\r\n\
             HOST: {target}\r\n\
             MAN: \"ssdp:discover\"\r\n\
             MX: {}\r\n\
             ST: libhue:idl\r\n\r\n",
            self.config.timeout.as_secs().max(1)
        )
    }

    fn find_bridges(self: &Arc<Self>) {
        let cycle = {
            let mut search = self.lock();
            search.timeout.stop();
            search.reported.clear();
            search.cycle += 1;
            let cycle = search.cycle;
            let weak = Arc::downgrade(self);
            search.timeout.start(self.config.timeout, async move {
                if let Some(shared) = weak.upgrade() {
                    shared.on_timeout(cycle);
                }
            });
            cycle
        };

        let request = self.search_request();
        debug!("Start searching for Hue bridges (cycle {}): {:?}", cycle, request);
        let shared = Arc::clone(self);
        runtime::spawn(async move {
            let target = SocketAddr::V4(shared.config.search_target);
            if let Err(e) = shared.socket.send_to(request.as_bytes(), target).await {
                warn!("Failed to write discovery datagram: {}", e);
                shared.emit(DiscoveryEvent::Error(e.to_string()));
            }
        });
    }

    fn on_timeout(self: &Arc<Self>, cycle: u64) {
        {
            let search = self.lock();
            if search.cycle != cycle || !search.reported.is_empty() {
                return;
            }
        }
        info!("No Hue bridge found, trying again");
        self.emit(DiscoveryEvent::NoBridgesFound);
        // Restarting aborts the timer task running this callback; nothing may follow.
        self.find_bridges();
    }

    fn handle_datagram(&self, payload: &[u8], sender: SocketAddr) {
        let text = String::from_utf8_lossy(payload);
        debug!("Got SSDP datagram from {}: {:?}", sender, text);

        if !text.to_ascii_lowercase().contains(BRIDGE_MARKER) {
            return;
        }
        let Some(bridge) = BridgeAddress::from_sender(sender) else {
            return;
        };

        {
            let mut search = self.lock();
            if !search.reported.insert(bridge) {
                return;
            }
            search.timeout.stop();
        }
        info!("Found Hue bridge at {}", bridge);
        self.emit(DiscoveryEvent::FoundBridge(bridge));
    }

    async fn receive_loop(weak: Weak<Shared>) {
        let mut buffer = vec![0u8; Discovery::RECV_BUFFER];
        loop {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if let Some((size, sender)) = next_datagram(&shared.socket, &mut buffer).await {
                shared.handle_datagram(&buffer[..size], sender);
            }
        }
    }
}

/// Receive one datagram. A failed receive pauses for [`RECV_RETRY_DELAY`]
/// and yields `None`.
async fn next_datagram<S: AsyncUdpSocket>(
    socket: &S,
    buffer: &mut [u8],
) -> Option<(usize, SocketAddr)> {
    match socket.recv_from(buffer).await {
        Ok(received) => Some(received),
        Err(e) => {
            debug!("Discovery receive error: {}", e);
            runtime::sleep(RECV_RETRY_DELAY).await;
            None
        }
    }
}
