//! Bridge-confirmed light state and metadata.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{DefaultOnError, serde_as};

use crate::types::{Alert, ColorMode, Effect, Xy};

/// The `state` object of a light resource, as last confirmed by the bridge.
#[serde_as]
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LightState {
    on: bool,
    bri: u8,
    hue: u16,
    sat: u8,
    xy: Xy,
    ct: u16,
    #[serde_as(as = "DefaultOnError")]
    alert: Alert,
    #[serde_as(as = "DefaultOnError")]
    effect: Effect,
    #[serde(rename = "colormode")]
    #[serde_as(as = "DefaultOnError")]
    color_mode: Option<ColorMode>,
    reachable: bool,
}

impl LightState {
    /// Whether the light is switched on.
    pub fn on(&self) -> bool {
        self.on
    }

    /// Brightness, 0-255.
    pub fn bri(&self) -> u8 {
        self.bri
    }

    /// Hue, 0-65535.
    pub fn hue(&self) -> u16 {
        self.hue
    }

    /// Saturation, 0-255.
    pub fn sat(&self) -> u8 {
        self.sat
    }

    pub fn xy(&self) -> Xy {
        self.xy
    }

    /// Color temperature in mired.
    pub fn ct(&self) -> u16 {
        self.ct
    }

    pub fn alert(&self) -> Alert {
        self.alert
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Which color representation last defined the light's color.
    pub fn color_mode(&self) -> Option<ColorMode> {
        self.color_mode
    }

    pub fn reachable(&self) -> bool {
        self.reachable
    }

    pub(crate) fn set_sat(&mut self, sat: u8) {
        self.sat = sat;
    }

    /// Adopt one confirmed attribute, e.g. `bri` from a
    /// `/lights/3/state/bri` success entry.
    ///
    /// Returns false for unknown attributes and values of the wrong type.
    pub(crate) fn adopt(&mut self, attribute: &str, value: &Value) -> bool {
        match attribute {
            "on" => assign(&mut self.on, value),
            "bri" => assign(&mut self.bri, value),
            "alert" => assign(&mut self.alert, value),
            "effect" => assign(&mut self.effect, value),
            "reachable" => assign(&mut self.reachable, value),
            "hue" => assign(&mut self.hue, value) && self.mode(ColorMode::Hs),
            "sat" => assign(&mut self.sat, value) && self.mode(ColorMode::Hs),
            "xy" => assign(&mut self.xy, value) && self.mode(ColorMode::Xy),
            "ct" => assign(&mut self.ct, value) && self.mode(ColorMode::Ct),
            _ => false,
        }
    }

    fn mode(&mut self, mode: ColorMode) -> bool {
        self.color_mode = Some(mode);
        true
    }
}

fn assign<T: DeserializeOwned>(field: &mut T, value: &Value) -> bool {
    match T::deserialize(value) {
        Ok(v) => {
            *field = v;
            true
        }
        Err(_) => false,
    }
}

/// A light resource as returned by `GET lights/{id}`.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LightInfo {
    pub name: String,
    #[serde(rename = "modelid")]
    pub model_id: String,
    #[serde(rename = "type")]
    pub light_type: String,
    #[serde(rename = "swversion")]
    pub sw_version: String,
    pub state: LightState,
}
