//! The set of lights known to the bridge.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use crate::config::LightConfig;
use crate::errors::Error;
use crate::light::Light;
use crate::response::{self, ReplyEntry};
use crate::session::{BridgeSession, RequestId};

type Result<T> = std::result::Result<T, Error>;

/// Changes to the membership of a [`LightCollection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionEvent {
    LightAdded(u32),
    LightRemoved(u32),
}

/// All lights of the bridge, ordered by id.
///
/// Lights are created from `GET lights` and each fetches its own state. Cloning
/// yields another handle to the same collection.
#[derive(Clone)]
pub struct LightCollection {
    shared: Arc<Shared>,
}

struct Shared {
    session: BridgeSession,
    config: LightConfig,
    lights: Mutex<BTreeMap<u32, Light>>,
    events: broadcast::Sender<CollectionEvent>,
}

/// Entry of the `GET lights` listing; only the name is of interest.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Listed {
    name: String,
}

impl LightCollection {
    const EVENT_CAPACITY: usize = 64;

    pub fn new(session: BridgeSession, config: LightConfig) -> Self {
        let (events, _) = broadcast::channel(Self::EVENT_CAPACITY);
        LightCollection {
            shared: Arc::new(Shared {
                session,
                config,
                lights: Mutex::new(BTreeMap::new()),
                events,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CollectionEvent> {
        self.shared.events.subscribe()
    }

    /// Fetch the light listing, adding new lights and dropping vanished ones.
    pub fn refresh(&self) -> Result<RequestId> {
        let weak = Arc::downgrade(&self.shared);
        self.shared.session.get("lights", move |_, reply| {
            if let Some(shared) = weak.upgrade() {
                shared.listing(reply);
            }
        })
    }

    pub fn lights(&self) -> Vec<Light> {
        self.shared.lock().values().cloned().collect()
    }

    pub fn get(&self, id: u32) -> Option<Light> {
        self.shared.lock().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.lock().is_empty()
    }

    /// Ask the bridge to search for new lights.
    ///
    /// The search runs on the bridge for about a minute; call
    /// [`LightCollection::refresh`] afterwards to pick up what it found.
    pub fn search_new(&self) -> Result<RequestId> {
        self.shared.session.post("lights", &json!({}), |_, reply| {
            match response::first_entry(&reply) {
                Some(ReplyEntry::Error(error)) => {
                    warn!("Searching for new lights failed: {}", error.description)
                }
                _ => info!("Bridge is searching for new lights"),
            }
        })
    }

    /// Remove light `id` from the bridge.
    pub fn delete(&self, id: u32) -> Result<RequestId> {
        let weak = Arc::downgrade(&self.shared);
        self.shared
            .session
            .delete(&format!("lights/{id}"), move |_, reply| {
                if let Some(shared) = weak.upgrade() {
                    shared.deleted(id, &reply);
                }
            })
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<u32, Light>> {
        self.lights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: CollectionEvent) {
        let _ = self.events.send(event);
    }

    fn listing(&self, reply: Value) {
        let Value::Object(entries) = reply else {
            warn!("Light listing is not an object");
            return;
        };
        let listed: BTreeMap<u32, Value> = entries
            .into_iter()
            .filter_map(|(key, entry)| match key.parse() {
                Ok(id) => Some((id, entry)),
                Err(_) => {
                    debug!("Skipping light with id {:?}", key);
                    None
                }
            })
            .collect();

        let mut added = Vec::new();
        let removed: Vec<u32> = {
            let mut lights = self.lock();
            for (id, entry) in listed.iter() {
                if lights.contains_key(id) {
                    continue;
                }
                let name = Listed::deserialize(entry).map(|l| l.name).unwrap_or_default();
                let light = Light::new(*id, &name, self.session.clone(), self.config.clone());
                lights.insert(*id, light);
                added.push(*id);
            }
            let removed = lights
                .keys()
                .copied()
                .filter(|id| !listed.contains_key(id))
                .collect::<Vec<_>>();
            for id in &removed {
                lights.remove(id);
            }
            removed
        };

        for id in added {
            self.emit(CollectionEvent::LightAdded(id));
        }
        for id in removed {
            self.emit(CollectionEvent::LightRemoved(id));
        }
    }

    fn deleted(&self, id: u32, reply: &Value) {
        if let Some(error) = response::first_error(reply) {
            warn!("Cannot delete light {}: {}", id, error.description);
            return;
        }
        if self.lock().remove(&id).is_some() {
            self.emit(CollectionEvent::LightRemoved(id));
        }
    }
}
