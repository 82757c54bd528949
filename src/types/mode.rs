//! String enums used in the light state resource.

use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum_macros::{Display, EnumString};

/// Which color representation last authoritatively defined the light's color.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, SerializeDisplay, DeserializeFromStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ColorMode {
    /// Hue and saturation
    Hs,
    /// CIE xy coordinates
    Xy,
    /// Color temperature
    Ct,
}

/// Alert effect, a temporary change to the bulb's state.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    EnumString,
    SerializeDisplay,
    DeserializeFromStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Alert {
    /// Not performing an alert
    #[default]
    None,
    /// One breathe cycle
    Select,
    /// Breathe cycles for 15 seconds
    LSelect,
}

/// Dynamic effect of the light.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Display,
    EnumString,
    SerializeDisplay,
    DeserializeFromStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Effect {
    #[default]
    None,
    /// Cycle through all hues at the current brightness and saturation
    ColorLoop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_value(Alert::LSelect).unwrap(), json!("lselect"));
        assert_eq!(serde_json::to_value(Effect::ColorLoop).unwrap(), json!("colorloop"));
        assert_eq!(
            serde_json::from_value::<ColorMode>(json!("xy")).unwrap(),
            ColorMode::Xy
        );
        assert_eq!("HS".parse::<ColorMode>().unwrap(), ColorMode::Hs);
    }

    #[test]
    fn test_unknown_value_is_an_error() {
        assert!(serde_json::from_value::<Effect>(json!("sparkle")).is_err());
    }
}
