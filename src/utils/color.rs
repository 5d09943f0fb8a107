use image::Rgba;
use serde::{Deserialize, Serialize};

/// A RGBA `Color`. Each color component is a floating point value
/// with a range from 0 to 1.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Color(pub f32, pub f32, pub f32, pub f32);

impl From<Color> for [u8; 4] {
    fn from(color: Color) -> [u8; 4] {
        let color = color.clip();
        [
            (color.0 * 255.0).round() as u8,
            (color.1 * 255.0).round() as u8,
            (color.2 * 255.0).round() as u8,
            (color.3 * 255.0).round() as u8,
        ]
    }
}

impl From<[u8; 4]> for Color {
    fn from(v: [u8; 4]) -> Self {
        Color(
            f32::from(v[0]) / 255.0,
            f32::from(v[1]) / 255.0,
            f32::from(v[2]) / 255.0,
            f32::from(v[3]) / 255.0,
        )
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Rgba<u8> {
        Rgba(color.into())
    }
}

impl From<Rgba<u8>> for Color {
    fn from(v: Rgba<u8>) -> Self {
        v.0.into()
    }
}

impl Color {
    /// Creates `Color` from a u32 encoded `RGBA`.
    pub fn from_rgba_u32(encoded: u32) -> Self {
        Color::from(encoded.to_be_bytes())
    }

    /// Encodes this color as a u32 `RGBA`.
    pub fn to_rgba_u32(self) -> u32 {
        u32::from_be_bytes(self.into())
    }

    /// Clip to [0.0, 1.0] range.
    pub fn clip(&self) -> Color {
        Color(
            self.0.max(0.0).min(1.0),
            self.1.max(0.0).min(1.0),
            self.2.max(0.0).min(1.0),
            self.3.max(0.0).min(1.0),
        )
    }

    #[inline]
    pub fn white() -> Self {
        Color(1.0, 1.0, 1.0, 1.0)
    }

    #[inline]
    pub fn black() -> Self {
        Color(0.0, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub fn red() -> Self {
        Color(1.0, 0.0, 0.0, 1.0)
    }

    #[inline]
    pub fn green() -> Self {
        Color(0.0, 1.0, 0.0, 1.0)
    }

    #[inline]
    pub fn blue() -> Self {
        Color(0.0, 0.0, 1.0, 1.0)
    }

    #[inline]
    pub fn transparent() -> Self {
        Color(0.0, 0.0, 0.0, 0.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn encode() {
        let c = Color::from_rgba_u32(0xFF80_0040);
        let bytes: [u8; 4] = c.into();
        assert_eq!(bytes, [0xFF, 0x80, 0x00, 0x40]);
        assert_eq!(c.to_rgba_u32(), 0xFF80_0040);
    }

    #[test]
    fn clip() {
        let rgba: Rgba<u8> = Color(2.0, -1.0, 0.5, 1.0).into();
        assert_eq!(rgba, Rgba([255, 0, 128, 255]));
    }
}
