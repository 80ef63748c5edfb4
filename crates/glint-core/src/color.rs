use serde::{Deserialize, Serialize};
use std::fmt;

/// An RGBA swatch color, each channel normalized to 0–1. This is the value
/// exchanged between the color-literal feature and editors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Color { r, g, b, a }
    }

    /// Opaque color from normalized channels, unchecked.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Color::rgba(r, g, b, 1.0)
    }

    /// Opaque color from normalized channels; any channel outside 0–1 is
    /// rejected.
    pub fn try_rgb(r: f32, g: f32, b: f32) -> Result<Self, ColorError> {
        match [r, g, b].into_iter().find(|c| !(0.0..=1.0).contains(c)) {
            Some(bad) => Err(ColorError::OutOfRange(bad as f64)),
            None => Ok(Color::rgb(r, g, b)),
        }
    }

    /// Opaque color from 8-bit channels; any channel outside 0–255 is
    /// rejected.
    pub fn try_rgb8(r: i64, g: i64, b: i64) -> Result<Self, ColorError> {
        match [r, g, b].into_iter().find(|c| !(0..=255).contains(c)) {
            Some(bad) => Err(ColorError::OutOfRange(bad as f64)),
            None => Ok(Color::rgb(
                channel_to_unit(r),
                channel_to_unit(g),
                channel_to_unit(b),
            )),
        }
    }

    /// Channels scaled to 0–255, rounded to nearest.
    pub fn to_rgba8(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a].map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
    }

    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
}

fn channel_to_unit(channel: i64) -> f32 {
    channel as f32 / 255.0
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// `#RRGGBB`, or `#RRGGBBAA` when not opaque.
impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba8();
        write!(f, "#{:02X}{:02X}{:02X}", r, g, b)?;
        if a != 255 {
            write!(f, "{:02X}", a)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ColorError {
    #[error("color component {0} is out of range")]
    OutOfRange(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_rgb_bounds() {
        assert!(Color::try_rgb(1.0, 0.5, 0.0).is_ok());
        assert!(matches!(
            Color::try_rgb(1.5, 0.5, 0.0),
            Err(ColorError::OutOfRange(v)) if v == 1.5
        ));
        assert!(Color::try_rgb(-0.1, 0.5, 0.0).is_err());
    }

    #[test]
    fn test_try_rgb8_bounds() {
        let c = Color::try_rgb8(255, 128, 0).unwrap();
        assert_eq!(c.to_rgba8(), [255, 128, 0, 255]);
        assert!(Color::try_rgb8(256, 0, 0).is_err());
        assert!(Color::try_rgb8(0, -1, 0).is_err());
    }

    #[test]
    fn test_hex_display() {
        assert_eq!(Color::RED.to_string(), "#FF0000");
        assert_eq!(Color::rgb(1.0, 0.5, 0.0).to_string(), "#FF8000");
        assert_eq!(Color::rgba(1.0, 0.0, 0.0, 0.5).to_string(), "#FF000080");
    }
}
