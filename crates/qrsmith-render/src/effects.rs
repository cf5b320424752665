//! Full-canvas post-processes applied after base and overlay drawing.
//!
//! `gradient` and `frame` are pure functions of the canvas and
//! parameters; `dots` draws its per-dot alpha from an injected RNG and
//! is non-deterministic unless the caller pins the seed.

use rand::rngs::StdRng;
use rand::Rng;
use tiny_skia::{
    BlendMode, Color, FillRule, GradientStop, Paint, PathBuilder, Point as SkiaPoint,
    RadialGradient, Rect, SpreadMode, Stroke, Transform,
};

use qrsmith_core::{EffectKind, Rgb};

use crate::canvas::Canvas;
use crate::compositor::RenderError;

/// Grid spacing of the dots effect, in device pixels, both axes.
pub const DOT_SPACING: u32 = 8;
/// Dot radius in device pixels.
pub const DOT_RADIUS: f32 = 2.0;
/// Exclusive upper bound of the per-dot alpha.
pub const DOT_MAX_ALPHA: f32 = 0.3;
/// Frame inset from each canvas edge.
pub const FRAME_INSET: f32 = 10.0;
/// Frame stroke width.
pub const FRAME_STROKE_WIDTH: f32 = 4.0;

/// Apply `effect` over the whole canvas, base pattern and overlay
/// alike.
pub fn apply(
    canvas: &mut Canvas,
    effect: EffectKind,
    stroke_color: Rgb,
    rng: &mut StdRng,
) -> Result<(), RenderError> {
    match effect {
        EffectKind::None => Ok(()),
        EffectKind::Gradient => gradient(canvas),
        EffectKind::Dots => dots(canvas, rng),
        EffectKind::Frame => frame(canvas, stroke_color),
    }
}

/// Radial white fade: alpha 0.8 at the center falling to 0.1 at half
/// the canvas width, blended source-over across the whole canvas.
fn gradient(canvas: &mut Canvas) -> Result<(), RenderError> {
    let size = canvas.size() as f32;
    let center = SkiaPoint::from_xy(size / 2.0, size / 2.0);
    let shader = RadialGradient::new(
        center,
        center,
        size / 2.0,
        vec![
            GradientStop::new(0.0, Color::from_rgba8(255, 255, 255, 204)),
            GradientStop::new(1.0, Color::from_rgba8(255, 255, 255, 26)),
        ],
        SpreadMode::Pad,
        Transform::identity(),
    )
    .ok_or(RenderError::Raster("radial gradient shader"))?;

    let mut paint = Paint::default();
    paint.shader = shader;
    paint.blend_mode = BlendMode::SourceOver;
    let full = Rect::from_xywh(0.0, 0.0, size, size).ok_or(RenderError::Raster("gradient rect"))?;
    canvas
        .pixmap_mut()
        .fill_rect(full, &paint, Transform::identity(), None);
    Ok(())
}

/// White dots on an 8px grid, radius 2, source-atop so they survive
/// only where the canvas already has opaque pixels. Each dot's alpha
/// is sampled independently from `rng` in [0, 0.3).
fn dots(canvas: &mut Canvas, rng: &mut StdRng) -> Result<(), RenderError> {
    let size = canvas.size();
    let mut paint = Paint::default();
    paint.anti_alias = true;
    paint.blend_mode = BlendMode::SourceAtop;

    for gy in (0..size).step_by(DOT_SPACING as usize) {
        for gx in (0..size).step_by(DOT_SPACING as usize) {
            let alpha = rng.gen_range(0.0..DOT_MAX_ALPHA);
            paint.set_color(
                Color::from_rgba(1.0, 1.0, 1.0, alpha).ok_or(RenderError::Raster("dot alpha"))?,
            );
            if let Some(dot) = PathBuilder::from_circle(gx as f32, gy as f32, DOT_RADIUS) {
                canvas.pixmap_mut().fill_path(
                    &dot,
                    &paint,
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }
        }
    }
    Ok(())
}

/// Stroked rectangle inset 10 from each edge, width 4, in the
/// request's stroke color.
fn frame(canvas: &mut Canvas, color: Rgb) -> Result<(), RenderError> {
    let size = canvas.size() as f32;
    let rect = Rect::from_xywh(
        FRAME_INSET,
        FRAME_INSET,
        size - 2.0 * FRAME_INSET,
        size - 2.0 * FRAME_INSET,
    )
    .ok_or(RenderError::Raster("frame rect"))?;

    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, 255);
    paint.anti_alias = true;
    let stroke = Stroke {
        width: FRAME_STROKE_WIDTH,
        ..Stroke::default()
    };
    canvas.pixmap_mut().stroke_path(
        &PathBuilder::from_rect(rect),
        &paint,
        &stroke,
        Transform::identity(),
        None,
    );
    Ok(())
}
