//! RGB to CIE xy conversion for the bridge's color model.

use crate::types::{Color, Xy};

/// Linear sRGB to CIE XYZ (D65 reference white).
const RGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];

/// Convert an RGB color into xy chromaticity and a bridge brightness.
///
/// Each channel is gamma-linearized, projected into XYZ and normalized to
/// `x = X / (X + Y + Z)`, `y = Y / (X + Y + Z)`. The brightness is the color's
/// HSV value channel, passed through unchanged. Black has no chromaticity and
/// maps to `(0, 0)`.
///
/// # Examples
///
/// ```
/// use hue_lights_rs::{Color, rgb_to_xy};
///
/// let (xy, bri) = rgb_to_xy(&Color::rgb(255, 255, 255));
/// assert!((xy.x - 0.3127).abs() < 1e-3);
/// assert!((xy.y - 0.3290).abs() < 1e-3);
/// assert_eq!(bri, 255);
/// ```
pub fn rgb_to_xy(color: &Color) -> (Xy, u8) {
    let rgb = [
        linearize(color.red()),
        linearize(color.green()),
        linearize(color.blue()),
    ];

    let [x, y, z] = RGB_TO_XYZ.map(|row| row[0] * rgb[0] + row[1] * rgb[1] + row[2] * rgb[2]);
    let sum = x + y + z;
    let xy = if sum > 0.0 {
        Xy::new(x / sum, y / sum)
    } else {
        Xy::default()
    };

    (xy, color.value())
}

fn linearize(channel: u8) -> f64 {
    let c = f64::from(channel) / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_black_has_fallback() {
        let (xy, bri) = rgb_to_xy(&Color::rgb(0, 0, 0));
        assert_eq!(xy, Xy::new(0.0, 0.0));
        assert!(!xy.x.is_nan() && !xy.y.is_nan());
        assert_eq!(bri, 0);
    }

    #[test]
    fn test_primaries() {
        let (red, bri) = rgb_to_xy(&Color::rgb(255, 0, 0));
        assert!(close(red.x, 0.6400) && close(red.y, 0.3300));
        assert_eq!(bri, 255);

        let (green, _) = rgb_to_xy(&Color::rgb(0, 255, 0));
        assert!(close(green.x, 0.3000) && close(green.y, 0.6000));

        let (blue, _) = rgb_to_xy(&Color::rgb(0, 0, 255));
        assert!(close(blue.x, 0.1500) && close(blue.y, 0.0600));
    }

    #[test]
    fn test_chromaticity_independent_of_intensity() {
        let (full, full_bri) = rgb_to_xy(&Color::rgb(200, 100, 50));
        let (dim, dim_bri) = rgb_to_xy(&Color::rgb(100, 50, 25));
        assert!((full.x - dim.x).abs() < 0.03);
        assert!((full.y - dim.y).abs() < 0.03);
        assert_eq!((full_bri, dim_bri), (200, 100));
    }

    #[test]
    fn test_deterministic() {
        let color = Color::rgb(12, 34, 56);
        assert_eq!(rgb_to_xy(&color), rgb_to_xy(&color));
    }
}
