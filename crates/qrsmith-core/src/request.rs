use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::Rgb;
use crate::shape::ClipShape;

/// Smallest permitted overlay area fraction of the canvas side.
pub const MIN_OVERLAY_FRACTION: f32 = 0.10;
/// Largest permitted overlay area fraction; above this the clip region
/// could touch the code's finder patterns on every side.
pub const MAX_OVERLAY_FRACTION: f32 = 0.50;
/// Default overlay area fraction (30% of the canvas side).
pub const DEFAULT_OVERLAY_FRACTION: f32 = 0.30;
/// Smallest permitted canvas side in pixels.
pub const MIN_CANVAS_SIZE: u32 = 200;
/// Largest permitted canvas side in pixels.
pub const MAX_CANVAS_SIZE: u32 = 800;

/// Errors raised while assembling a [`RenderRequest`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    #[error("overlay area fraction {0} outside [{MIN_OVERLAY_FRACTION}, {MAX_OVERLAY_FRACTION}]")]
    FractionOutOfRange(f32),

    #[error("canvas size {0} outside [{MIN_CANVAS_SIZE}, {MAX_CANVAS_SIZE}] pixels")]
    CanvasSizeOutOfRange(u32),

    #[error("invalid color literal '{0}', expected #RRGGBB")]
    InvalidColor(String),
}

/// Error-correction level forwarded to the symbol encoder. Higher
/// levels add pattern redundancy and tolerate more logo occlusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EcLevel {
    L,
    M,
    Q,
    H,
}

impl Default for EcLevel {
    fn default() -> Self {
        Self::M
    }
}

impl EcLevel {
    /// Resolve a level tag from a UI selector; unknown tags fall back
    /// to the default `M`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "L" => Self::L,
            "M" => Self::M,
            "Q" => Self::Q,
            "H" => Self::H,
            _ => Self::M,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        }
    }
}

/// Full-canvas post-process applied after base and overlay are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    None,
    Gradient,
    Dots,
    Frame,
}

impl Default for EffectKind {
    fn default() -> Self {
        Self::None
    }
}

impl EffectKind {
    /// Resolve an effect tag from a UI selector; unknown tags fall back
    /// to `None` (no post-process).
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "none" => Self::None,
            "gradient" => Self::Gradient,
            "dots" => Self::Dots,
            "frame" => Self::Frame,
            _ => Self::None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gradient => "gradient",
            Self::Dots => "dots",
            Self::Frame => "frame",
        }
    }
}

/// Input tuple for the external symbol encoder collaborator: the text
/// to encode plus module colors and redundancy level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeParams {
    pub text: String,
    pub foreground: Rgb,
    pub background: Rgb,
    pub level: EcLevel,
}

impl CodeParams {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            foreground: Rgb::BLACK,
            background: Rgb::WHITE,
            level: EcLevel::default(),
        }
    }

    pub fn with_colors(mut self, foreground: Rgb, background: Rgb) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    pub fn with_level(mut self, level: EcLevel) -> Self {
        self.level = level;
        self
    }
}

/// The complete parameter set for one render.
///
/// One request produces exactly one output raster: construct, render,
/// discard. Fields are private so a validated request cannot be
/// mutated afterwards; use the `with_*` combinators while building.
///
/// The compositor performs no placement avoidance for the code's three
/// finder patterns; warning the user about risky shape/fraction
/// combinations is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    base_image: Vec<u8>,
    overlay_image: Option<Vec<u8>>,
    overlay_area_fraction: f32,
    shape: ClipShape,
    effect: EffectKind,
    stroke_color: Rgb,
    canvas_size: u32,
}

impl RenderRequest {
    /// Start a request from the encoder-produced base raster bytes and
    /// the output canvas side length.
    pub fn new(base_image: Vec<u8>, canvas_size: u32) -> Result<Self, RequestError> {
        if !(MIN_CANVAS_SIZE..=MAX_CANVAS_SIZE).contains(&canvas_size) {
            return Err(RequestError::CanvasSizeOutOfRange(canvas_size));
        }
        Ok(Self {
            base_image,
            overlay_image: None,
            overlay_area_fraction: DEFAULT_OVERLAY_FRACTION,
            shape: ClipShape::default(),
            effect: EffectKind::default(),
            stroke_color: Rgb::BLACK,
            canvas_size,
        })
    }

    /// Replace the base raster bytes, e.g. after the symbol encoder
    /// produced them for an otherwise pre-assembled request.
    pub fn with_base_image(mut self, bytes: Vec<u8>) -> Self {
        self.base_image = bytes;
        self
    }

    pub fn with_overlay(mut self, bytes: Vec<u8>) -> Self {
        self.overlay_image = Some(bytes);
        self
    }

    pub fn with_overlay_area(mut self, fraction: f32) -> Result<Self, RequestError> {
        if !(MIN_OVERLAY_FRACTION..=MAX_OVERLAY_FRACTION).contains(&fraction) {
            return Err(RequestError::FractionOutOfRange(fraction));
        }
        self.overlay_area_fraction = fraction;
        Ok(self)
    }

    pub fn with_shape(mut self, shape: ClipShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_effect(mut self, effect: EffectKind) -> Self {
        self.effect = effect;
        self
    }

    pub fn with_stroke_color(mut self, color: Rgb) -> Self {
        self.stroke_color = color;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn base_image(&self) -> &[u8] {
        &self.base_image
    }

    pub fn overlay_image(&self) -> Option<&[u8]> {
        self.overlay_image.as_deref()
    }

    pub fn overlay_area_fraction(&self) -> f32 {
        self.overlay_area_fraction
    }

    pub fn shape(&self) -> ClipShape {
        self.shape
    }

    pub fn effect(&self) -> EffectKind {
        self.effect
    }

    pub fn stroke_color(&self) -> Rgb {
        self.stroke_color
    }

    pub fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    /// Side length of the square overlay box in pixels. The box is
    /// square regardless of the overlay image's native aspect ratio.
    pub fn overlay_box_size(&self) -> f32 {
        self.canvas_size as f32 * self.overlay_area_fraction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_size_bounds() {
        assert!(RenderRequest::new(vec![], 200).is_ok());
        assert!(RenderRequest::new(vec![], 800).is_ok());
        assert_eq!(
            RenderRequest::new(vec![], 199).unwrap_err(),
            RequestError::CanvasSizeOutOfRange(199)
        );
        assert_eq!(
            RenderRequest::new(vec![], 801).unwrap_err(),
            RequestError::CanvasSizeOutOfRange(801)
        );
    }

    #[test]
    fn test_fraction_bounds() {
        let req = RenderRequest::new(vec![], 300).unwrap();
        assert!(req.clone().with_overlay_area(0.10).is_ok());
        assert!(req.clone().with_overlay_area(0.50).is_ok());
        assert_eq!(
            req.clone().with_overlay_area(0.05).unwrap_err(),
            RequestError::FractionOutOfRange(0.05)
        );
        assert!(req.with_overlay_area(0.55).is_err());
    }

    #[test]
    fn test_overlay_box_size() {
        let req = RenderRequest::new(vec![], 300)
            .unwrap()
            .with_overlay_area(0.30)
            .unwrap();
        assert!((req.overlay_box_size() - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_defaults_match_ui_initial_state() {
        let req = RenderRequest::new(vec![1, 2, 3], 300).unwrap();
        assert_eq!(req.shape(), ClipShape::Circle);
        assert_eq!(req.effect(), EffectKind::None);
        assert_eq!(req.stroke_color(), Rgb::BLACK);
        assert!(req.overlay_image().is_none());
        assert!((req.overlay_area_fraction() - 0.30).abs() < 1e-6);
    }

    #[test]
    fn test_effect_tag_fallback() {
        assert_eq!(EffectKind::from_tag("sparkle"), EffectKind::None);
        assert_eq!(EffectKind::from_tag("frame"), EffectKind::Frame);
    }

    #[test]
    fn test_level_tag_fallback() {
        assert_eq!(EcLevel::from_tag("X"), EcLevel::M);
        assert_eq!(EcLevel::from_tag("H"), EcLevel::H);
    }

    #[test]
    fn test_params_serialize_roundtrip() {
        let params = CodeParams::new("https://example.com")
            .with_colors(Rgb::from_hex("#DC2626").unwrap(), Rgb::WHITE)
            .with_level(EcLevel::H);
        let json = serde_json::to_string(&params).unwrap();
        let back: CodeParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back.text, params.text);
        assert_eq!(back.foreground, params.foreground);
        assert_eq!(back.level, EcLevel::H);
    }
}
