//! Individual light control.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::config::LightConfig;
use crate::response;
use crate::runtime::Timer;
use crate::session::{BridgeSession, RequestId};
use crate::state::{LightInfo, LightState};
use crate::transform::rgb_to_xy;
use crate::types::{Alert, Color, Effect};
use crate::update::StateUpdate;

/// Notifications emitted by a [`Light`].
#[derive(Debug, Clone, PartialEq)]
pub enum LightEvent {
    /// Bridge-confirmed state was adopted.
    StateChanged,
    /// A state write completed, or was given up on after the write timeout.
    WriteOperationFinished,
    NameChanged(String),
    /// Model, type or software version were (re)loaded.
    MetadataChanged,
}

/// A single light connected to the bridge.
///
/// Local changes are written with `PUT lights/{id}/state`, one request at a
/// time. Changes requested while a write is in flight are coalesced into a
/// pending update and sent as a single follow-up once the write completes.
/// Local state only follows what the bridge confirms.
///
/// Cloning yields another handle to the same light.
#[derive(Clone)]
pub struct Light {
    shared: Arc<Shared>,
}

struct Shared {
    id: u32,
    session: BridgeSession,
    config: LightConfig,
    inner: Mutex<LightInner>,
    events: broadcast::Sender<LightEvent>,
}

struct LightInner {
    info: LightInfo,
    /// The in-flight state write, if any.
    busy: Option<RequestId>,
    pending: StateUpdate,
    refreshed: bool,
    safety: Timer,
}

impl Light {
    const EVENT_CAPACITY: usize = 32;

    /// Create the light with bridge id `id` and fetch its state.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(id: u32, name: &str, session: BridgeSession, config: LightConfig) -> Self {
        let (events, _) = broadcast::channel(Self::EVENT_CAPACITY);
        let light = Light {
            shared: Arc::new(Shared {
                id,
                session,
                config,
                inner: Mutex::new(LightInner {
                    info: LightInfo {
                        name: name.to_string(),
                        ..LightInfo::default()
                    },
                    busy: None,
                    pending: StateUpdate::new(),
                    refreshed: false,
                    safety: Timer::new(),
                }),
                events,
            }),
        };
        light.refresh();
        light
    }

    pub fn id(&self) -> u32 {
        self.shared.id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LightEvent> {
        self.shared.events.subscribe()
    }

    pub fn name(&self) -> String {
        self.shared.lock().info.name.clone()
    }

    pub fn model_id(&self) -> String {
        self.shared.lock().info.model_id.clone()
    }

    pub fn light_type(&self) -> String {
        self.shared.lock().info.light_type.clone()
    }

    pub fn sw_version(&self) -> String {
        self.shared.lock().info.sw_version.clone()
    }

    pub fn info(&self) -> LightInfo {
        self.shared.lock().info.clone()
    }

    pub fn state(&self) -> LightState {
        self.shared.lock().info.state.clone()
    }

    /// The in-flight state write, if any.
    pub fn busy_request(&self) -> Option<RequestId> {
        self.shared.lock().busy
    }

    pub fn is_busy(&self) -> bool {
        self.busy_request().is_some()
    }

    /// Fetch the full light resource, once. Later calls do nothing.
    pub fn refresh(&self) {
        let mut inner = self.shared.lock();
        if inner.refreshed {
            return;
        }
        inner.refreshed = self.shared.fetch();
    }

    /// Fetch the full light resource again.
    pub fn reload(&self) {
        self.shared.fetch();
    }

    pub fn set_on(&self, on: bool) {
        let mut update = StateUpdate::new();
        update.on(on);
        self.shared.change(update, |state| state.on() == on);
    }

    pub fn set_bri(&self, bri: u8) {
        let mut update = StateUpdate::new();
        update.bri(bri).on(true);
        self.shared.change(update, |state| state.bri() == bri);
    }

    pub fn set_hue(&self, hue: u16) {
        let mut update = StateUpdate::new();
        update.hue(hue).on(true);
        self.shared.change(update, |state| state.hue() == hue);
    }

    pub fn set_sat(&self, sat: u8) {
        let mut update = StateUpdate::new();
        update.sat(sat).on(true);
        self.shared.change(update, |state| state.sat() == sat);
    }

    /// Set an RGB color, written as xy plus brightness.
    ///
    /// The bridge does not echo saturation for xy writes, so the color's
    /// saturation is recorded locally right away.
    pub fn set_color(&self, color: &Color) {
        let (xy, bri) = rgb_to_xy(color);
        let mut update = StateUpdate::new();
        update.xy(xy).bri(bri).on(true);

        let mut inner = self.shared.lock();
        let requested = self.shared.change_locked(&mut inner, update, |state| {
            state.xy() == xy && state.bri() == bri
        });
        if requested {
            inner.info.state.set_sat(color.saturation());
        }
    }

    /// Set the color temperature in mired.
    pub fn set_ct(&self, ct: u16) {
        let mut update = StateUpdate::new();
        update.ct(ct).on(true);
        self.shared.change(update, |state| state.ct() == ct);
    }

    pub fn set_alert(&self, alert: Alert) {
        let mut update = StateUpdate::new();
        update.alert(alert);
        self.shared.change(update, |state| state.alert() == alert);
    }

    pub fn set_effect(&self, effect: Effect) {
        let mut update = StateUpdate::new();
        update.effect(effect);
        self.shared.change(update, |state| state.effect() == effect);
    }

    /// Rename the light. Independent of state writes.
    pub fn set_name(&self, name: &str) {
        if self.shared.lock().info.name == name {
            return;
        }
        let weak = Arc::downgrade(&self.shared);
        let path = format!("lights/{}", self.shared.id);
        let issued = self
            .shared
            .session
            .put(&path, &json!({ "name": name }), move |_, reply| {
                if let Some(shared) = weak.upgrade() {
                    shared.name_reply(&reply);
                }
            });
        if let Err(e) = issued {
            warn!("Cannot rename light {}: {}", self.shared.id, e);
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LightInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: LightEvent) {
        let _ = self.events.send(event);
    }

    fn change<F>(self: &Arc<Self>, update: StateUpdate, is_current: F)
    where
        F: FnOnce(&LightState) -> bool,
    {
        let mut inner = self.lock();
        self.change_locked(&mut inner, update, is_current);
    }

    /// Write `update` now, or queue it while a write is in flight.
    ///
    /// Returns false if nothing was requested because the light is idle and
    /// already in the requested state.
    fn change_locked<F>(self: &Arc<Self>, inner: &mut LightInner, update: StateUpdate, is_current: F) -> bool
    where
        F: FnOnce(&LightState) -> bool,
    {
        if inner.busy.is_some() {
            debug!("Light {} busy, queueing {:?}", self.id, update);
            inner.pending.merge(update);
            return true;
        }
        if is_current(&inner.info.state) {
            return false;
        }
        self.write(inner, update);
        true
    }

    fn write(self: &Arc<Self>, inner: &mut LightInner, update: StateUpdate) {
        let weak = Arc::downgrade(self);
        let path = format!("lights/{}/state", self.id);
        let issued = self.session.put(&path, &update, move |id, reply| {
            if let Some(shared) = weak.upgrade() {
                shared.state_reply(id, &reply);
            }
        });

        match issued {
            Ok(id) => {
                inner.busy = Some(id);
                let weak = Arc::downgrade(self);
                inner.safety.start(self.config.write_timeout, async move {
                    if let Some(shared) = weak.upgrade() {
                        debug!("Write {} to light {} timed out", id, shared.id);
                        shared.state_reply(id, &Value::Null);
                    }
                });
            }
            Err(e) => warn!("Cannot write state of light {}: {}", self.id, e),
        }
    }

    fn state_reply(self: &Arc<Self>, id: RequestId, reply: &Value) {
        {
            let mut inner = self.lock();
            if inner.busy != Some(id) {
                debug!("Ignoring stale reply {} for light {}", id, self.id);
                return;
            }

            let prefix = format!("/lights/{}/state/", self.id);
            for (path, value) in response::successes(reply) {
                let adopted = path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|attribute| inner.info.state.adopt(attribute, value));
                if !adopted {
                    debug!("Light {} ignores {} = {}", self.id, path, value);
                }
            }
            if let Some(error) = response::first_error(reply) {
                warn!("Light {} rejected write: {}", self.id, error.description);
            }

            inner.busy = None;
            inner.safety.stop();
            if let Some(batch) = inner.pending.take_next_batch() {
                self.write(&mut inner, batch);
            }
        }

        self.emit(LightEvent::StateChanged);
        self.emit(LightEvent::WriteOperationFinished);
    }

    /// Issue `GET lights/{id}`; true if the request went out.
    fn fetch(self: &Arc<Self>) -> bool {
        let weak = Arc::downgrade(self);
        let issued = self
            .session
            .get(&format!("lights/{}", self.id), move |_, reply| {
                if let Some(shared) = weak.upgrade() {
                    shared.info_reply(reply);
                }
            });
        match issued {
            Ok(_) => true,
            Err(e) => {
                debug!("Cannot refresh light {}: {}", self.id, e);
                false
            }
        }
    }

    fn info_reply(&self, reply: Value) {
        let info: LightInfo = match serde_json::from_value(reply) {
            Ok(info) => info,
            Err(e) => {
                warn!("Unexpected reply for light {}: {}", self.id, e);
                return;
            }
        };
        self.lock().info = info;
        self.emit(LightEvent::MetadataChanged);
        self.emit(LightEvent::StateChanged);
    }

    fn name_reply(&self, reply: &Value) {
        debug!("Rename of light {} finished: {}", self.id, reply);
        let key = format!("/lights/{}/name", self.id);
        let name = response::successes(reply)
            .find(|(path, _)| *path == key)
            .and_then(|(_, value)| value.as_str());
        if let Some(name) = name {
            self.lock().info.name = name.to_string();
            self.emit(LightEvent::NameChanged(name.to_string()));
        }
    }
}
