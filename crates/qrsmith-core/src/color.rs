use serde::{Deserialize, Serialize};

use crate::request::RequestError;

/// An 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` literal as produced by a color picker.
    /// A leading `#` is optional.
    pub fn from_hex(hex: &str) -> Result<Self, RequestError> {
        let raw = hex.strip_prefix('#').unwrap_or(hex);
        if raw.len() != 6 || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(RequestError::InvalidColor(hex.to_string()));
        }
        // Length and digit checks above make these three parses infallible.
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&raw[range], 16).unwrap_or_default()
        };
        Ok(Self {
            r: channel(0..2),
            g: channel(2..4),
            b: channel(4..6),
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::BLACK
    }
}
