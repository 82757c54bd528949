//! Authenticated HTTP session with a Hue bridge.
//!
//! The session owns the transport, the API key and the table correlating every
//! in-flight request with the callback that wants its reply. Requests are issued
//! without blocking and complete on spawned tasks, in whatever order the bridge
//! answers.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::discovery::BridgeAddress;
use crate::errors::Error;
use crate::response::{self, ReplyEntry};
use crate::runtime;
use crate::transport::{BridgeRequest, HttpTransport, Method, Transport};

type Result<T> = std::result::Result<T, Error>;

/// Ticket handed out for every issued request; unique per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Invoked once with the request id and the parsed JSON reply.
pub(crate) type Callback = Box<dyn FnOnce(RequestId, Value) + Send + 'static>;

/// Connection status of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeStatus {
    /// No bridge accepted yet.
    #[default]
    Searching,
    /// A bridge was accepted but no API key has been confirmed.
    Connecting,
    /// The bridge rejected the pre-provisioned API key.
    AuthenticationFailure,
    /// Requests can be issued.
    Connected,
}

/// Session-wide notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ApiKeyChanged(String),
    StatusChanged(BridgeStatus),
    /// A bridge address was accepted for this session.
    BridgeFound(BridgeAddress),
    /// The bridge is reachable with an API key.
    ConnectedBridgeChanged(BridgeAddress),
    /// A discovery cycle found nothing; discovery keeps searching.
    NoBridgesFound,
    /// Bridge discovery failed.
    DiscoveryError(String),
    /// The bridge refused to create a user.
    CreateUserFailed(String),
    /// A mutating request completed; state on the bridge may have changed.
    StateChanged,
    /// A request issued with [`BridgeSession::get_strict`] failed at the transport level.
    GetFailed { request_id: RequestId, error: String },
}

/// Handle to the (single) bridge connection.
///
/// Cloning is cheap and yields another handle to the same session; lights and
/// collections are given a clone at construction time.
#[derive(Clone)]
pub struct BridgeSession {
    shared: Arc<Shared>,
}

struct Shared {
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Default)]
struct SessionState {
    bridge: Option<BridgeAddress>,
    api_key: String,
    /// `http://{bridge}/api/{api_key}/`, present only with both inputs.
    base_url: Option<String>,
    status: BridgeStatus,
    request_counter: u64,
    pending: HashMap<RequestId, Ticket>,
    /// In-flight POST/PUT/DELETE requests.
    writes: HashSet<RequestId>,
}

struct Ticket {
    operation: String,
    on_reply: Option<Callback>,
}

impl SessionState {
    fn register(&mut self, operation: String, write: bool, on_reply: Option<Callback>) -> RequestId {
        let id = RequestId(self.request_counter);
        self.request_counter += 1;
        self.pending.insert(id, Ticket { operation, on_reply });
        if write {
            self.writes.insert(id);
        }
        id
    }
}

impl BridgeSession {
    const EVENT_CAPACITY: usize = 64;

    /// Create a session talking HTTP through reqwest.
    pub fn new(config: SessionConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    pub fn with_transport(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(Self::EVENT_CAPACITY);
        BridgeSession {
            shared: Arc::new(Shared {
                transport,
                config,
                state: Mutex::new(SessionState::default()),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn status(&self) -> BridgeStatus {
        self.shared.lock().status
    }

    pub fn api_key(&self) -> String {
        self.shared.lock().api_key.clone()
    }

    pub fn bridge(&self) -> Option<BridgeAddress> {
        self.shared.lock().bridge
    }

    pub fn bridge_found(&self) -> bool {
        self.bridge().is_some()
    }

    /// The accepted bridge, but only once an API key is known.
    pub fn connected_bridge(&self) -> Option<BridgeAddress> {
        let state = self.shared.lock();
        state.bridge.filter(|_| !state.api_key.is_empty())
    }

    pub fn base_url(&self) -> Option<String> {
        self.shared.lock().base_url.clone()
    }

    /// Number of requests still waiting for a reply.
    pub fn in_flight(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// Number of mutating requests still waiting for a reply.
    pub fn pending_writes(&self) -> usize {
        self.shared.lock().writes.len()
    }

    /// Accept a bridge address, moving the session to [`BridgeStatus::Connecting`].
    ///
    /// If an API key is already known it is verified against the bridge.
    pub fn set_bridge(&self, bridge: BridgeAddress) {
        let has_key = {
            let mut state = self.shared.lock();
            if state.bridge == Some(bridge) {
                return;
            }
            state.bridge = Some(bridge);
            self.shared.update_base_url(&mut state);
            state.status = BridgeStatus::Connecting;
            !state.api_key.is_empty()
        };

        info!("Using Hue bridge at {}", bridge);
        if has_key {
            self.shared.emit(SessionEvent::ConnectedBridgeChanged(bridge));
        }
        self.shared.emit(SessionEvent::BridgeFound(bridge));
        self.shared
            .emit(SessionEvent::StatusChanged(BridgeStatus::Connecting));

        if has_key {
            self.verify_api_key();
        }
    }

    /// Use a pre-provisioned API key.
    ///
    /// With a bridge already accepted and the session not yet connected, the key
    /// is verified against the bridge.
    pub fn set_api_key(&self, api_key: &str) {
        let verify = {
            let mut state = self.shared.lock();
            if state.api_key == api_key {
                return;
            }
            state.api_key = api_key.to_string();
            self.shared.update_base_url(&mut state);
            state.base_url.is_some() && state.status != BridgeStatus::Connected
        };

        self.shared
            .emit(SessionEvent::ApiKeyChanged(api_key.to_string()));
        if verify {
            self.verify_api_key();
        }
    }

    /// Ask the bridge to create a user (API key).
    ///
    /// The link button of the bridge must have been pressed shortly before.
    /// Without a `username` a random one is generated. The outcome arrives as
    /// [`SessionEvent::CreateUserFailed`] or as [`SessionEvent::ApiKeyChanged`]
    /// followed by [`BridgeStatus::Connected`].
    pub fn create_user(&self, device_type: &str, username: Option<&str>) -> Result<RequestId> {
        let username = username
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let body = json!({ "devicetype": device_type, "username": username });
        let body = serde_json::to_vec(&body).map_err(Error::JsonDump)?;

        let weak = Arc::downgrade(&self.shared);
        let on_reply: Callback = Box::new(move |_, reply| {
            if let Some(session) = upgrade(&weak) {
                session.create_user_finished(&reply);
            }
        });

        let (id, request) = {
            let mut state = self.shared.lock();
            let bridge = state.bridge.ok_or(Error::NoBridge)?;
            let request = BridgeRequest {
                method: Method::Post,
                url: format!("{}api", self.shared.root_url(bridge)),
                body: Some(body),
            };
            debug!("Sending createUser to {} as {:?}", bridge, device_type);
            let id = state.register("POST api".to_string(), false, Some(on_reply));
            (id, request)
        };
        self.shared.dispatch(id, request, false);
        Ok(id)
    }

    /// GET `path` relative to the authenticated API root.
    pub fn get<F>(&self, path: &str, on_reply: F) -> Result<RequestId>
    where
        F: FnOnce(RequestId, Value) + Send + 'static,
    {
        self.issue(Method::Get, path, None, false, Some(Box::new(on_reply)))
    }

    /// Like [`BridgeSession::get`], but a transport failure is also reported
    /// as [`SessionEvent::GetFailed`].
    pub fn get_strict<F>(&self, path: &str, on_reply: F) -> Result<RequestId>
    where
        F: FnOnce(RequestId, Value) + Send + 'static,
    {
        self.issue(Method::Get, path, None, true, Some(Box::new(on_reply)))
    }

    pub fn delete<F>(&self, path: &str, on_reply: F) -> Result<RequestId>
    where
        F: FnOnce(RequestId, Value) + Send + 'static,
    {
        self.issue(Method::Delete, path, None, false, Some(Box::new(on_reply)))
    }

    pub fn post<B, F>(&self, path: &str, body: &B, on_reply: F) -> Result<RequestId>
    where
        B: Serialize + ?Sized,
        F: FnOnce(RequestId, Value) + Send + 'static,
    {
        let body = serde_json::to_vec(body).map_err(Error::JsonDump)?;
        self.issue(Method::Post, path, Some(body), false, Some(Box::new(on_reply)))
    }

    pub fn put<B, F>(&self, path: &str, body: &B, on_reply: F) -> Result<RequestId>
    where
        B: Serialize + ?Sized,
        F: FnOnce(RequestId, Value) + Send + 'static,
    {
        let body = serde_json::to_vec(body).map_err(Error::JsonDump)?;
        self.issue(Method::Put, path, Some(body), false, Some(Box::new(on_reply)))
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        self.shared.emit(event);
    }

    fn issue(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        strict: bool,
        on_reply: Option<Callback>,
    ) -> Result<RequestId> {
        let (id, request) = {
            let mut state = self.shared.lock();
            let Some(base_url) = state.base_url.as_deref() else {
                warn!("Not authenticated to bridge, cannot {} {}", method, path);
                return Err(Error::not_authenticated(path));
            };
            let request = BridgeRequest {
                method,
                url: format!("{base_url}{path}"),
                body,
            };
            let id = state.register(format!("{method} {path}"), method.is_write(), on_reply);
            (id, request)
        };
        self.shared.dispatch(id, request, strict);
        Ok(id)
    }

    fn verify_api_key(&self) {
        let weak = Arc::downgrade(&self.shared);
        let issued = self.get("lights", move |_, reply| {
            if let Some(session) = upgrade(&weak) {
                session.verification_finished(&reply);
            }
        });
        if let Err(e) = issued {
            debug!("Cannot verify api key: {}", e);
        }
    }

    fn verification_finished(&self, reply: &Value) {
        if let Some(ReplyEntry::Error(error)) = response::first_entry(reply) {
            warn!("Bridge rejected the api key: {}", error.description);
            self.shared.set_status(BridgeStatus::AuthenticationFailure);
        } else if reply.is_object() {
            self.shared.set_status(BridgeStatus::Connected);
        } else {
            warn!("Unexpected reply while verifying the api key: {}", reply);
        }
    }

    fn create_user_finished(&self, reply: &Value) {
        debug!("Create user finished: {}", reply);
        match response::first_entry(reply) {
            Some(ReplyEntry::Error(error)) => {
                warn!("Error creating user: {}", error.description);
                self.shared
                    .emit(SessionEvent::CreateUserFailed(error.description));
            }
            Some(ReplyEntry::Success(success)) => {
                match success.get("username").and_then(Value::as_str) {
                    Some(username) => self.authenticated(username),
                    None => warn!("Create user succeeded without a username: {}", reply),
                }
            }
            _ => warn!("Neither error nor success contained in create user reply"),
        }
    }

    fn authenticated(&self, username: &str) {
        let bridge = {
            let mut state = self.shared.lock();
            state.api_key = username.to_string();
            self.shared.update_base_url(&mut state);
            state.status = BridgeStatus::Connected;
            state.bridge
        };

        self.shared
            .emit(SessionEvent::ApiKeyChanged(username.to_string()));
        self.shared
            .emit(SessionEvent::StatusChanged(BridgeStatus::Connected));
        if let Some(bridge) = bridge {
            self.shared
                .emit(SessionEvent::ConnectedBridgeChanged(bridge));
        }
    }
}

fn upgrade(weak: &Weak<Shared>) -> Option<BridgeSession> {
    weak.upgrade().map(|shared| BridgeSession { shared })
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn root_url(&self, bridge: BridgeAddress) -> String {
        match self.config.http_port {
            80 => format!("http://{bridge}/"),
            port => format!("http://{bridge}:{port}/"),
        }
    }

    fn update_base_url(&self, state: &mut SessionState) {
        state.base_url = match state.bridge {
            Some(bridge) if !state.api_key.is_empty() => {
                Some(format!("{}api/{}/", self.root_url(bridge), state.api_key))
            }
            _ => None,
        };
    }

    fn set_status(&self, status: BridgeStatus) {
        {
            let mut state = self.lock();
            if state.status == status {
                return;
            }
            state.status = status;
        }
        self.emit(SessionEvent::StatusChanged(status));
    }

    fn dispatch(self: &Arc<Self>, id: RequestId, request: BridgeRequest, strict: bool) {
        debug!("{} {} (request {})", request.method, request.url, id);
        let reply = self.transport.execute(request);
        let shared = Arc::clone(self);
        runtime::spawn(async move {
            let result = reply.await;
            shared.complete(id, result, strict);
        });
    }

    fn complete(&self, id: RequestId, result: Result<Vec<u8>>, strict: bool) {
        let (ticket, was_write) = {
            let mut state = self.lock();
            (state.pending.remove(&id), state.writes.remove(&id))
        };
        let operation = ticket
            .as_ref()
            .map_or("unknown operation", |t| t.operation.as_str());

        let body = match result {
            Ok(body) => body,
            Err(e) => {
                warn!("Request {} ({}) failed: {}", id, operation, e);
                if strict {
                    self.emit(SessionEvent::GetFailed {
                        request_id: id,
                        error: e.to_string(),
                    });
                }
                return;
            }
        };

        // An unparsable reply is dropped without invoking the callback
        let reply: Value = match serde_json::from_slice(&body) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Error parsing reply to request {} ({}): {}", id, operation, e);
                return;
            }
        };

        if was_write {
            self.emit(SessionEvent::StateChanged);
        }
        if let Some(on_reply) = ticket.and_then(|t| t.on_reply) {
            on_reply(id, reply);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use std::sync::mpsc;

    use crate::transport::testing::{ScriptedTransport, settle};

    fn bridge() -> BridgeAddress {
        BridgeAddress::new(Ipv4Addr::new(10, 0, 0, 2))
    }

    fn session(transport: &Arc<ScriptedTransport>) -> BridgeSession {
        BridgeSession::with_transport(transport.clone(), SessionConfig::default())
    }

    /// A session that is connected without a verification round trip.
    fn connected(transport: &Arc<ScriptedTransport>) -> BridgeSession {
        let session = session(transport);
        session.set_bridge(bridge());
        session.authenticated("key");
        session
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_requires_authentication() {
        let transport = ScriptedTransport::new();
        let session = session(&transport);
        assert_eq!(
            session.get("lights", |_, _| {}).err(),
            Some(Error::not_authenticated("lights"))
        );

        // A bridge alone is not enough
        session.set_bridge(bridge());
        assert!(session.put("lights/1/state", &json!({"on": true}), |_, _| {}).is_err());
        assert_eq!(transport.len(), 0);
        assert_eq!(session.in_flight(), 0);
    }

    #[test]
    fn test_base_url() {
        let transport = ScriptedTransport::new();
        let session = session(&transport);
        session.set_api_key("abc");
        assert_eq!(session.base_url(), None);
        assert_eq!(session.connected_bridge(), None);

        let config = SessionConfig {
            http_port: 8080,
            ..SessionConfig::default()
        };
        let other = BridgeSession::with_transport(transport.clone(), config);
        other.set_bridge(bridge());
        other.authenticated("abc");
        assert_eq!(other.base_url().as_deref(), Some("http://10.0.0.2:8080/api/abc/"));
    }

    #[tokio::test]
    async fn test_request_ids_and_callbacks() {
        let transport = ScriptedTransport::new();
        let session = connected(&transport);
        let (tx, rx) = mpsc::channel();

        let mut ids = Vec::new();
        for light in 1..=3 {
            let tx = tx.clone();
            let id = session
                .get(&format!("lights/{light}"), move |id, reply| {
                    tx.send((id, reply)).unwrap();
                })
                .unwrap();
            ids.push(id);
        }
        assert_eq!(ids.iter().map(|id| id.value()).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(transport.request(1).url, "http://10.0.0.2/api/key/lights/2");
        assert_eq!(transport.request(1).method, Method::Get);
        assert_eq!(session.in_flight(), 3);

        // Replies arrive out of order and still reach their own callback
        transport.reply(2, json!({"name": "three"}));
        transport.reply(0, json!({"name": "one"}));
        settle().await;

        let mut got: Vec<_> = rx.try_iter().collect();
        got.sort_by_key(|(id, _)| *id);
        assert_eq!(
            got,
            vec![(ids[0], json!({"name": "one"})), (ids[2], json!({"name": "three"}))]
        );
        assert_eq!(session.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_writes_announce_state_change() {
        let transport = ScriptedTransport::new();
        let session = connected(&transport);
        let mut events = session.subscribe();

        session.get("lights/1", |_, _| {}).unwrap();
        session
            .put("lights/1/state", &json!({"bri": 10}), |_, _| {})
            .unwrap();
        session.delete("lights/2", |_, _| {}).unwrap();
        assert_eq!(session.pending_writes(), 2);
        assert_eq!(transport.body(1), json!({"bri": 10}));

        transport.reply(0, json!({}));
        settle().await;
        assert!(drain(&mut events).is_empty());

        transport.reply(1, json!([{"success": {"/lights/1/state/bri": 10}}]));
        transport.reply(2, json!([{"success": "/lights/2 deleted"}]));
        settle().await;
        assert_eq!(
            drain(&mut events),
            vec![SessionEvent::StateChanged, SessionEvent::StateChanged]
        );
        assert_eq!(session.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_unparsable_reply_is_dropped() {
        let transport = ScriptedTransport::new();
        let session = connected(&transport);
        let mut events = session.subscribe();
        let (tx, rx) = mpsc::channel();

        session
            .put("lights/1/state", &json!({"on": false}), move |id, _| {
                tx.send(id).unwrap();
            })
            .unwrap();
        transport.reply_raw(0, b"<html>busy</html>");
        settle().await;

        assert!(rx.try_recv().is_err());
        assert!(drain(&mut events).is_empty());
        assert_eq!(session.in_flight(), 0);
        assert_eq!(session.pending_writes(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure() {
        let transport = ScriptedTransport::new();
        let session = connected(&transport);
        let mut events = session.subscribe();

        session.get("lights/1", |_, _| {}).unwrap();
        let strict = session.get_strict("lights/2", |_, _| {}).unwrap();
        transport.fail(0);
        transport.fail(1);
        settle().await;

        let events = drain(&mut events);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            SessionEvent::GetFailed { request_id, .. } if *request_id == strict
        ));
        assert_eq!(session.status(), BridgeStatus::Connected);
        assert_eq!(session.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_create_user_success() {
        let transport = ScriptedTransport::new();
        let session = session(&transport);
        assert_eq!(session.status(), BridgeStatus::Searching);
        session.set_bridge(bridge());
        assert_eq!(session.status(), BridgeStatus::Connecting);
        let mut events = session.subscribe();

        session.create_user("shine#laptop", Some("shineuser1")).unwrap();
        let request = transport.request(0);
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "http://10.0.0.2/api");
        assert_eq!(
            transport.body(0),
            json!({"devicetype": "shine#laptop", "username": "shineuser1"})
        );

        transport.reply(0, json!([{"success": {"username": "shineuser1"}}]));
        settle().await;

        assert_eq!(session.api_key(), "shineuser1");
        assert_eq!(session.status(), BridgeStatus::Connected);
        assert_eq!(session.connected_bridge(), Some(bridge()));
        assert_eq!(session.base_url().as_deref(), Some("http://10.0.0.2/api/shineuser1/"));
        assert_eq!(
            drain(&mut events),
            vec![
                SessionEvent::ApiKeyChanged("shineuser1".into()),
                SessionEvent::StatusChanged(BridgeStatus::Connected),
                SessionEvent::ConnectedBridgeChanged(bridge()),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_user_failure() {
        let transport = ScriptedTransport::new();
        let session = session(&transport);
        session.set_bridge(bridge());
        let mut events = session.subscribe();

        session.create_user("shine", None).unwrap();
        let username = transport.body(0)["username"].as_str().unwrap().to_string();
        assert_eq!(username.len(), 32);

        transport.reply(
            0,
            json!([{"error": {"type": 101, "address": "", "description": "link button not pressed"}}]),
        );
        settle().await;

        assert_eq!(
            drain(&mut events),
            vec![SessionEvent::CreateUserFailed("link button not pressed".into())]
        );
        assert_eq!(session.api_key(), "");
        assert_eq!(session.status(), BridgeStatus::Connecting);
    }

    #[test]
    fn test_create_user_needs_bridge() {
        let transport = ScriptedTransport::new();
        let session = session(&transport);
        assert_eq!(session.create_user("shine", None).err(), Some(Error::NoBridge));
    }

    #[tokio::test]
    async fn test_preprovisioned_key_accepted() {
        let transport = ScriptedTransport::new();
        let session = session(&transport);
        session.set_api_key("saved");
        let mut events = session.subscribe();

        session.set_bridge(bridge());
        assert_eq!(session.status(), BridgeStatus::Connecting);
        assert_eq!(transport.request(0).url, "http://10.0.0.2/api/saved/lights");

        transport.reply(0, json!({"1": {"name": "Hue Lamp 1"}}));
        settle().await;

        assert_eq!(session.status(), BridgeStatus::Connected);
        assert_eq!(
            drain(&mut events),
            vec![
                SessionEvent::ConnectedBridgeChanged(bridge()),
                SessionEvent::BridgeFound(bridge()),
                SessionEvent::StatusChanged(BridgeStatus::Connecting),
                SessionEvent::StatusChanged(BridgeStatus::Connected),
            ]
        );
    }

    #[tokio::test]
    async fn test_preprovisioned_key_rejected() {
        let transport = ScriptedTransport::new();
        let session = session(&transport);
        session.set_bridge(bridge());
        session.set_api_key("stale");
        assert_eq!(transport.request(0).url, "http://10.0.0.2/api/stale/lights");

        transport.reply(
            0,
            json!([{"error": {"type": 1, "address": "/lights", "description": "unauthorized user"}}]),
        );
        settle().await;
        assert_eq!(session.status(), BridgeStatus::AuthenticationFailure);

        // Pairing afterwards still connects
        session.create_user("shine", Some("fresh")).unwrap();
        transport.reply(1, json!([{"success": {"username": "fresh"}}]));
        settle().await;
        assert_eq!(session.status(), BridgeStatus::Connected);
        assert_eq!(session.api_key(), "fresh");
    }
}
