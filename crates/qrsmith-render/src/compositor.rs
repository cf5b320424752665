use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

use qrsmith_core::{ClipPath, CodeParams, EffectKind, RenderRequest, RequestError};

use crate::canvas::Canvas;
use crate::effects;
use crate::encoder::{CodeEncoder, EncodeError};
use crate::raster::{resize_exact, ImageLoader, RenderOutput};

// ── Errors ────────────────────────────────────────────────────────────

/// Failures that abort a render. No partial raster is ever produced:
/// the output is only assembled after the final stage succeeds.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Surfaced from the symbol-encoder collaborator, untouched.
    #[error("symbol encoding failed: {0}")]
    Encoding(#[from] EncodeError),

    /// Base or overlay bytes could not be decoded into an image.
    #[error("image decode failed: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Render parameters rejected while assembling a request.
    #[error("invalid render request: {0}")]
    Request(#[from] RequestError),

    /// Pixel buffer allocation failed for the given side length.
    #[error("canvas allocation failed for size {0}")]
    Canvas(u32),

    /// Internal rasterization failure; unreachable with a validated
    /// request.
    #[error("rasterization failed: {0}")]
    Raster(&'static str),
}

// ── Compositor ────────────────────────────────────────────────────────

/// Stage-ordered raster compositor.
///
/// Every call to [`render`](Compositor::render) owns a freshly
/// allocated canvas, so overlapping in-flight renders can never touch
/// the same buffer. There is no cancellation primitive: a superseded
/// render runs to completion and returns a stale result; keeping only
/// the newest output is the caller's concern.
pub struct Compositor<L: ImageLoader> {
    loader: L,
    rng_seed: Option<u64>,
}

impl Compositor<crate::raster::BytesLoader> {
    /// Compositor with the built-in in-memory byte decoder.
    pub fn new() -> Self {
        Self::with_loader(crate::raster::BytesLoader)
    }
}

impl Default for Compositor<crate::raster::BytesLoader> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ImageLoader> Compositor<L> {
    pub fn with_loader(loader: L) -> Self {
        Self {
            loader,
            rng_seed: None,
        }
    }

    /// Pin the dots-effect randomness to a fixed seed for reproducible
    /// output. Without this, each render seeds from entropy.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Run the full pipeline for one request and return the flattened
    /// raster.
    ///
    /// Stage order is fixed: decode base, draw base, then (only when
    /// an overlay is present) decode overlay, clip, draw overlay, and
    /// finally the effect pass over the entire canvas. The two decodes
    /// are the pipeline's only suspension points and nothing runs in
    /// parallel within one render.
    pub async fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let size = request.canvas_size();

        debug!("decoding base raster ({} bytes)", request.base_image().len());
        let base = self.loader.load(request.base_image()).await?;

        let mut canvas = Canvas::new(size)?;
        debug!("drawing base raster scaled to {size}x{size}");
        let base = resize_exact(&base, size, size);
        canvas.draw_raster(&base, 0, 0)?;

        if let Some(bytes) = request.overlay_image() {
            debug!("decoding overlay image ({} bytes)", bytes.len());
            let overlay = self.loader.load(bytes).await?;

            // The overlay region is always square; the decoded image is
            // stretched to fit regardless of its native aspect ratio.
            let box_size = request.overlay_box_size();
            let box_px = box_size.round().max(1.0) as u32;
            let center = size as f32 / 2.0;
            let clip_path = ClipPath::build(request.shape(), box_size, box_size, center, center);
            debug!(
                "compositing overlay inside {} region ({box_px}px box)",
                request.shape().tag()
            );

            let overlay = resize_exact(&overlay, box_px, box_px);
            let origin = ((size.saturating_sub(box_px)) / 2) as i32;
            let mut scope = canvas.clip(&clip_path)?;
            scope.draw_raster(&overlay, origin, origin)?;
        }

        if request.effect() != EffectKind::None {
            debug!("applying {} effect", request.effect().tag());
            let mut rng = match self.rng_seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            effects::apply(&mut canvas, request.effect(), request.stroke_color(), &mut rng)?;
        }

        Ok(RenderOutput::new(canvas.into_image()))
    }

    /// One-shot generate path: ask the encoder collaborator for the
    /// base raster, then run the normal pipeline. Encoder failures are
    /// surfaced as [`RenderError::Encoding`] before any drawing
    /// happens.
    pub async fn render_encoded<E: CodeEncoder>(
        &self,
        encoder: &E,
        params: &CodeParams,
        request: RenderRequest,
    ) -> Result<RenderOutput, RenderError> {
        debug!(
            "encoding {} bytes of text at level {}",
            params.text.len(),
            params.level.tag()
        );
        let base = encoder.encode(params, request.canvas_size())?;
        self.render(&request.with_base_image(base)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncodeError;
    use image::{ImageFormat, Rgba, RgbaImage};
    use qrsmith_core::{ClipShape, EcLevel, Rgb};
    use std::io::Cursor;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn png_bytes(image: &RgbaImage) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    fn solid_png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
        png_bytes(&RgbaImage::from_pixel(width, height, Rgba(color)))
    }

    /// Base raster whose left half is opaque black and right half is
    /// fully transparent.
    fn half_transparent_png(size: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(size, size, |x, _| {
            if x < size / 2 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([0, 0, 0, 0])
            }
        });
        png_bytes(&img)
    }

    fn px(out: &RenderOutput, x: u32, y: u32) -> [u8; 4] {
        out.image().get_pixel(x, y).0
    }

    struct FixedEncoder {
        result: Result<Vec<u8>, EncodeError>,
    }

    impl CodeEncoder for FixedEncoder {
        fn encode(&self, _params: &CodeParams, _target_size: u32) -> Result<Vec<u8>, EncodeError> {
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn test_deterministic_effects_are_idempotent() {
        init_logging();
        let compositor = Compositor::new();
        for effect in [EffectKind::None, EffectKind::Gradient, EffectKind::Frame] {
            let request = RenderRequest::new(solid_png(60, 60, [0, 0, 0, 255]), 300)
                .unwrap()
                .with_overlay(solid_png(60, 60, [255, 0, 0, 255]))
                .with_effect(effect);
            let first = compositor.render(&request).await.unwrap();
            let second = compositor.render(&request).await.unwrap();
            assert_eq!(
                first.image(),
                second.image(),
                "{} render not reproducible",
                effect.tag()
            );
        }
    }

    #[tokio::test]
    async fn test_circle_overlay_scenario() {
        init_logging();
        // 300px canvas, circle clip, fraction 0.30 -> central circle of
        // diameter 90 shows the red overlay, everything else the base.
        let request = RenderRequest::new(solid_png(60, 60, [0, 0, 0, 255]), 300)
            .unwrap()
            .with_overlay(solid_png(60, 60, [255, 0, 0, 255]))
            .with_overlay_area(0.30)
            .unwrap()
            .with_shape(ClipShape::Circle);
        let out = Compositor::new().render(&request).await.unwrap();

        assert_eq!(out.width(), 300);
        assert_eq!(out.height(), 300);
        assert_eq!(px(&out, 150, 150), [255, 0, 0, 255]);
        // 30px from center: still inside radius 45.
        assert_eq!(px(&out, 180, 150), [255, 0, 0, 255]);
        // 60px from center: outside the circle, base pattern retained.
        assert_eq!(px(&out, 210, 150), [0, 0, 0, 255]);
        assert_eq!(px(&out, 10, 10), [0, 0, 0, 255]);
    }

    #[tokio::test]
    async fn test_frame_without_overlay_scenario() {
        init_logging();
        let request = RenderRequest::new(solid_png(60, 60, [255, 255, 255, 255]), 300)
            .unwrap()
            .with_effect(EffectKind::Frame)
            .with_stroke_color(Rgb::from_hex("#DC2626").unwrap());
        let out = Compositor::new().render(&request).await.unwrap();

        // Stroke band covers [8, 12] from each edge.
        assert_eq!(px(&out, 10, 150), [0xDC, 0x26, 0x26, 255]);
        assert_eq!(px(&out, 150, 10), [0xDC, 0x26, 0x26, 255]);
        // The base pattern is untouched inside and outside the band.
        assert_eq!(px(&out, 150, 150), [255, 255, 255, 255]);
        assert_eq!(px(&out, 2, 150), [255, 255, 255, 255]);
    }

    #[tokio::test]
    async fn test_effect_blends_over_overlay_without_erasing_it() {
        init_logging();
        let request = RenderRequest::new(solid_png(60, 60, [0, 0, 0, 255]), 300)
            .unwrap()
            .with_overlay(solid_png(60, 60, [255, 0, 0, 255]))
            .with_effect(EffectKind::Gradient);
        let out = Compositor::new().render(&request).await.unwrap();

        // White gradient over the red overlay: red channel saturated,
        // green lifted by the gradient but not to full white.
        let [r, g, _, a] = px(&out, 150, 150);
        assert_eq!(a, 255);
        assert_eq!(r, 255);
        assert!(g > 0, "gradient not visible over overlay");
        assert!(g < 255, "overlay fully erased by gradient");
    }

    #[tokio::test]
    async fn test_frame_leaves_overlay_center_intact() {
        init_logging();
        let request = RenderRequest::new(solid_png(60, 60, [0, 0, 0, 255]), 300)
            .unwrap()
            .with_overlay(solid_png(60, 60, [255, 0, 0, 255]))
            .with_effect(EffectKind::Frame)
            .with_stroke_color(Rgb::new(0, 0, 255));
        let out = Compositor::new().render(&request).await.unwrap();
        assert_eq!(px(&out, 150, 150), [255, 0, 0, 255]);
        assert_eq!(px(&out, 10, 150), [0, 0, 255, 255]);
    }

    #[tokio::test]
    async fn test_gradient_applies_without_overlay() {
        init_logging();
        let plain = RenderRequest::new(solid_png(60, 60, [0, 0, 0, 255]), 300).unwrap();
        let with_effect = plain.clone().with_effect(EffectKind::Gradient);
        let compositor = Compositor::new();
        let base = compositor.render(&plain).await.unwrap();
        let lit = compositor.render(&with_effect).await.unwrap();
        assert_ne!(base.image(), lit.image());
        // Center is brightened by the white radial fade.
        assert!(px(&lit, 150, 150)[0] > px(&base, 150, 150)[0]);
    }

    #[tokio::test]
    async fn test_dots_structural_properties() {
        init_logging();
        let request = RenderRequest::new(half_transparent_png(64), 256)
            .unwrap()
            .with_effect(EffectKind::Dots);
        let compositor = Compositor::new().with_rng_seed(42);
        let dotted = compositor.render(&request).await.unwrap();
        let plain = Compositor::new()
            .render(&request.clone().with_effect(EffectKind::None))
            .await
            .unwrap();

        for y in 0..256u32 {
            for x in 0..256u32 {
                let before = px(&plain, x, y);
                let after = px(&dotted, x, y);
                // Source-atop: transparent base pixels stay transparent.
                if before[3] == 0 {
                    assert_eq!(after[3], 0, "dot appeared over transparency at ({x},{y})");
                    continue;
                }
                if after == before {
                    continue;
                }
                // A changed pixel must sit on the dot grid.
                let near = |v: u32| {
                    let m = (v as f32 + 0.5) % effects::DOT_SPACING as f32;
                    m.min(effects::DOT_SPACING as f32 - m)
                };
                let (dx, dy) = (near(x), near(y));
                assert!(
                    dx * dx + dy * dy <= 7.6,
                    "off-grid dot pixel at ({x},{y})"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_dots_reproducible_with_pinned_seed() {
        init_logging();
        let request = RenderRequest::new(solid_png(60, 60, [0, 0, 0, 255]), 256)
            .unwrap()
            .with_effect(EffectKind::Dots);
        let seeded = Compositor::new().with_rng_seed(7);
        let first = seeded.render(&request).await.unwrap();
        let second = seeded.render(&request).await.unwrap();
        assert_eq!(first.image(), second.image());

        let other_seed = Compositor::new().with_rng_seed(8);
        let third = other_seed.render(&request).await.unwrap();
        assert_ne!(first.image(), third.image());
    }

    #[tokio::test]
    async fn test_base_decode_failure_aborts() {
        init_logging();
        let request = RenderRequest::new(vec![0xDE, 0xAD], 300).unwrap();
        let err = Compositor::new().render(&request).await;
        assert!(matches!(err, Err(RenderError::ImageDecode(_))));
    }

    #[tokio::test]
    async fn test_overlay_decode_failure_aborts() {
        init_logging();
        let request = RenderRequest::new(solid_png(60, 60, [0, 0, 0, 255]), 300)
            .unwrap()
            .with_overlay(vec![0xBA, 0xD0]);
        let err = Compositor::new().render(&request).await;
        assert!(matches!(err, Err(RenderError::ImageDecode(_))));
    }

    #[tokio::test]
    async fn test_render_encoded_happy_path() {
        init_logging();
        let encoder = FixedEncoder {
            result: Ok(solid_png(60, 60, [0, 0, 0, 255])),
        };
        let params = CodeParams::new("https://example.com").with_level(EcLevel::H);
        let request = RenderRequest::new(Vec::new(), 300).unwrap();
        let out = Compositor::new()
            .render_encoded(&encoder, &params, request)
            .await
            .unwrap();
        assert_eq!(out.width(), 300);
        assert_eq!(px(&out, 150, 150), [0, 0, 0, 255]);
    }

    #[tokio::test]
    async fn test_render_encoded_surfaces_encoder_failure() {
        init_logging();
        let encoder = FixedEncoder {
            result: Err(EncodeError::DataTooLong {
                len: 5000,
                level: EcLevel::H,
            }),
        };
        let params = CodeParams::new("x");
        let request = RenderRequest::new(Vec::new(), 300).unwrap();
        let err = Compositor::new()
            .render_encoded(&encoder, &params, request)
            .await;
        match err {
            Err(RenderError::Encoding(EncodeError::DataTooLong { len, level })) => {
                assert_eq!(len, 5000);
                assert_eq!(level, EcLevel::H);
            }
            other => panic!("expected encoding failure, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_every_shape_renders_overlay() {
        init_logging();
        let shapes = [
            ClipShape::Circle,
            ClipShape::Square,
            ClipShape::Rounded,
            ClipShape::Diamond,
            ClipShape::Heart,
        ];
        let compositor = Compositor::new();
        for shape in shapes {
            let request = RenderRequest::new(solid_png(60, 60, [0, 0, 0, 255]), 300)
                .unwrap()
                .with_overlay(solid_png(60, 60, [255, 0, 0, 255]))
                .with_shape(shape);
            let out = compositor.render(&request).await.unwrap();
            // (150, 170) is interior to every supported shape: the
            // heart's top notch dips below the canvas center, so the
            // center itself is not inside the heart.
            assert_eq!(
                px(&out, 150, 170),
                [255, 0, 0, 255],
                "{} overlay missing near center",
                shape.tag()
            );
            // Corners are always outside the clip box.
            assert_eq!(px(&out, 5, 5), [0, 0, 0, 255]);
        }
    }
}
