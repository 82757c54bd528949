//! CIE xy chromaticity coordinates.

use serde::{Deserialize, Serialize};

/// A point in the CIE 1931 xy chromaticity space, both coordinates in [0, 1].
///
/// The bridge transfers it as a two-element JSON array `[x, y]`.
#[derive(Default, Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Xy {
    pub x: f64,
    pub y: f64,
}

impl Xy {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Xy {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Xy> for [f64; 2] {
    fn from(xy: Xy) -> Self {
        [xy.x, xy.y]
    }
}
