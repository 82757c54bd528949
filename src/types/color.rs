//! RGB color representation.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::Error;

/// An RGB color with red, green, and blue components (0-255 each).
///
/// This is what a color picker hands to [`crate::Light::set_color`]; the light
/// converts it into the bridge's xy chromaticity plus a brightness.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub(crate) red: u8,
    pub(crate) green: u8,
    pub(crate) blue: u8,
}

impl Color {
    /// Create a color with the given RGB values.
    pub fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    pub fn red(&self) -> u8 {
        self.red
    }

    pub fn green(&self) -> u8 {
        self.green
    }

    pub fn blue(&self) -> u8 {
        self.blue
    }

    /// The HSV value channel (0-255), i.e. the brightest component.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Color;
    ///
    /// assert_eq!(Color::rgb(10, 200, 30).value(), 200);
    /// ```
    pub fn value(&self) -> u8 {
        self.red.max(self.green).max(self.blue)
    }

    /// The HSV saturation channel scaled to 0-255.
    ///
    /// # Examples
    ///
    /// ```
    /// use hue_lights_rs::Color;
    ///
    /// assert_eq!(Color::rgb(255, 0, 0).saturation(), 255);
    /// assert_eq!(Color::rgb(128, 128, 128).saturation(), 0);
    /// assert_eq!(Color::rgb(0, 0, 0).saturation(), 0);
    /// ```
    pub fn saturation(&self) -> u8 {
        let max = u32::from(self.value());
        let min = u32::from(self.red.min(self.green).min(self.blue));
        if max == 0 {
            return 0;
        }
        // (max - min) <= max, so the quotient never exceeds 255
        ((max - min) * 255 / max) as u8
    }
}

impl FromStr for Color {
    type Err = Error;

    /// Parse from comma-separated string (e.g., "255,128,0").
    fn from_str(s: &str) -> Result<Self, Error> {
        let parts = s
            .split(',')
            .map(|c| c.trim().parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|_| Error::InvalidColorString(s.to_string()))?;
        match parts.as_slice() {
            [r, g, b] => Ok(Self::rgb(*r, *g, *b)),
            _ => Err(Error::InvalidColorString(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color() {
        assert_eq!(Color::from_str("255,128,0").unwrap(), Color::rgb(255, 128, 0));
        assert_eq!(Color::from_str(" 1, 2 ,3").unwrap(), Color::rgb(1, 2, 3));
    }

    #[test]
    fn test_parse_color_rejects_bad_input() {
        assert_eq!(
            Color::from_str("255,128"),
            Err(Error::InvalidColorString("255,128".into()))
        );
        assert!(Color::from_str("256,0,0").is_err());
        assert!(Color::from_str("red").is_err());
    }
}
