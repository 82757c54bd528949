//! Partial light state updates.

use serde::{Deserialize, Serialize};

use crate::types::{Alert, Effect, Xy};

/// A partial update of a light's state, serialized as the body of
/// `PUT lights/{id}/state`.
///
/// Unset fields are left out of the JSON body. A light also uses one of these as
/// its pending update: changes requested while a write is in flight are merged
/// into it (the last value per field wins) and drained later with
/// [`StateUpdate::take_next_batch`].
///
/// ```
/// use hue_lights_rs::StateUpdate;
///
/// let mut update = StateUpdate::new();
/// update.bri(120).on(true);
/// assert_eq!(
///     serde_json::to_string(&update).unwrap(),
///     r#"{"on":true,"bri":120}"#
/// );
/// ```
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StateUpdate {
    pub(crate) on: Option<bool>,
    pub(crate) bri: Option<u8>,
    pub(crate) hue: Option<u16>,
    pub(crate) sat: Option<u8>,
    pub(crate) xy: Option<Xy>,
    pub(crate) ct: Option<u16>,
    pub(crate) alert: Option<Alert>,
    pub(crate) effect: Option<Effect>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn on(&mut self, on: bool) -> &mut Self {
        self.on = Some(on);
        self
    }

    pub fn bri(&mut self, bri: u8) -> &mut Self {
        self.bri = Some(bri);
        self
    }

    pub fn hue(&mut self, hue: u16) -> &mut Self {
        self.hue = Some(hue);
        self
    }

    pub fn sat(&mut self, sat: u8) -> &mut Self {
        self.sat = Some(sat);
        self
    }

    pub fn xy(&mut self, xy: Xy) -> &mut Self {
        self.xy = Some(xy);
        self
    }

    /// Color temperature in mired.
    pub fn ct(&mut self, ct: u16) -> &mut Self {
        self.ct = Some(ct);
        self
    }

    /// Set the alert; anything but [`Alert::None`] also turns the light on.
    pub fn alert(&mut self, alert: Alert) -> &mut Self {
        self.alert = Some(alert);
        if alert != Alert::None {
            self.on = Some(true);
        }
        self
    }

    /// Set the effect; anything but [`Effect::None`] also turns the light on.
    pub fn effect(&mut self, effect: Effect) -> &mut Self {
        self.effect = Some(effect);
        if effect != Effect::None {
            self.on = Some(true);
        }
        self
    }

    fn has_hs(&self) -> bool {
        self.hue.is_some() || self.sat.is_some()
    }

    /// Overwrite the fields of `self` with every field set in `other`.
    ///
    /// A color mode requested by `other` (hue/sat, ct or xy) replaces pending
    /// fields of the other color modes, so the latest color wins.
    pub fn merge(&mut self, other: StateUpdate) {
        if other.has_hs() || other.ct.is_some() || other.xy.is_some() {
            if !other.has_hs() {
                self.hue = None;
                self.sat = None;
            }
            if other.ct.is_none() {
                self.ct = None;
            }
            if other.xy.is_none() {
                self.xy = None;
            }
        }
        self.on = other.on.or(self.on);
        self.bri = other.bri.or(self.bri);
        self.hue = other.hue.or(self.hue);
        self.sat = other.sat.or(self.sat);
        self.xy = other.xy.or(self.xy);
        self.ct = other.ct.or(self.ct);
        self.alert = other.alert.or(self.alert);
        self.effect = other.effect.or(self.effect);
    }

    /// Remove and return the next group of fields to write.
    ///
    /// Only one color mode goes out per write: hue/sat if either is set,
    /// otherwise ct, otherwise xy. `on`, `bri`, `alert` and `effect` always
    /// travel with the first batch. Returns `None` when nothing is pending.
    pub fn take_next_batch(&mut self) -> Option<StateUpdate> {
        if self.is_empty() {
            return None;
        }

        let mut batch = StateUpdate {
            on: self.on.take(),
            bri: self.bri.take(),
            alert: self.alert.take(),
            effect: self.effect.take(),
            ..StateUpdate::default()
        };
        if self.has_hs() {
            batch.hue = self.hue.take();
            batch.sat = self.sat.take();
        } else if self.ct.is_some() {
            batch.ct = self.ct.take();
        } else {
            batch.xy = self.xy.take();
        }
        Some(batch)
    }
}
